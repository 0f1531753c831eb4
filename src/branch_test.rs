use super::*;

fn addr(s: &str) -> Address {
    Address(s.to_string())
}

#[test]
fn advance_from_empty_head_succeeds() {
    let branch = Branch::new("main", None);
    branch.advance(None, addr("fluree:mem:commit/1.json")).unwrap();
    assert_eq!(branch.head(), Some(addr("fluree:mem:commit/1.json")));
}

#[test]
fn advance_with_stale_expectation_is_a_conflict() {
    let branch = Branch::new("main", Some(addr("fluree:mem:commit/1.json")));
    let err = branch.advance(None, addr("fluree:mem:commit/2.json")).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);
}

#[test]
fn second_of_two_racing_advances_loses() {
    let branch = Branch::new("main", Some(addr("fluree:mem:commit/1.json")));
    let expected = addr("fluree:mem:commit/1.json");
    branch.advance(Some(&expected), addr("fluree:mem:commit/2.json")).unwrap();
    let err = branch.advance(Some(&expected), addr("fluree:mem:commit/2b.json")).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);
}
