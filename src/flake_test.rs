use super::*;

fn sid(ns: u32, local: &str) -> Sid {
    Sid::new(ns, local)
}

fn flake(t: u64, op: bool) -> Flake {
    Flake::new(
        sid(0, "alice"),
        sid(0, "age"),
        Object::Int(30),
        sid(0, "xsd:integer"),
        t,
        op,
        None,
    )
}

#[test]
fn spot_orders_by_subject_then_predicate() {
    let a = Flake::new(sid(0, "a"), sid(0, "p"), Object::Int(1), sid(0, "dt"), 1, true, None);
    let b = Flake::new(sid(0, "b"), sid(0, "p"), Object::Int(1), sid(0, "dt"), 1, true, None);
    assert_eq!(IndexOrder::Spot.compare(&a, &b), Ordering::Less);
}

#[test]
fn retraction_supersedes_assertion_at_same_spot_key() {
    let asserted = flake(1, true);
    let retracted = flake(2, false);
    assert!(is_live_at(vec![&asserted], 1));
    assert!(!is_live_at(vec![&asserted, &retracted], 2));
    assert!(!is_live_at(vec![&asserted, &retracted], 5));
}

#[test]
fn live_at_respects_time_travel() {
    let asserted = flake(1, true);
    let retracted = flake(2, false);
    let reasserted = flake(3, true);
    let history = vec![&asserted, &retracted, &reasserted];
    assert!(is_live_at(history.clone(), 1), "live right after assertion");
    assert!(!is_live_at(history.clone(), 2), "retracted at t=2");
    assert!(is_live_at(history, 3), "reasserted at t=3");
}

#[test]
fn opst_only_applies_to_reference_objects() {
    let refflake = Flake::new(
        sid(0, "a"),
        sid(0, "knows"),
        Object::Ref(sid(0, "b")),
        sid(0, "id"),
        1,
        true,
        None,
    );
    let litflake = flake(1, true);
    assert!(IndexOrder::Opst.applies_to(&refflake));
    assert!(!IndexOrder::Opst.applies_to(&litflake));
}
