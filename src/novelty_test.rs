use super::*;
use crate::flake::Object;
use crate::sid::Sid;

fn flake(s: &str, t: u64, op: bool) -> Flake {
    Flake::new(
        Sid::new(0, s),
        Sid::new(0, "age"),
        Object::Int(t as i64),
        Sid::new(0, "xsd:integer"),
        t,
        op,
        None,
    )
}

#[test]
fn novelty_is_closed_under_comparator_ordering() {
    let mut novelty = Novelty::new();
    novelty.add(flake("b", 1, true));
    novelty.add(flake("a", 2, true));
    let ordered: Vec<_> = novelty.iter_order(IndexOrder::Spot).map(|f| f.s.local.clone()).collect();
    assert_eq!(ordered, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn clearing_one_order_does_not_affect_others() {
    let mut novelty = Novelty::new();
    novelty.add(flake("a", 1, true));
    novelty.clear_order(IndexOrder::Spot);
    assert!(novelty.iter_order(IndexOrder::Spot).next().is_none());
    assert!(novelty.iter_order(IndexOrder::Psot).next().is_some());
}

#[test]
fn byte_accounting_grows_and_resets() {
    let mut novelty = Novelty::new();
    assert!(novelty.is_empty());
    novelty.add(flake("a", 1, true));
    assert!(novelty.total_bytes() > 0);
    novelty.clear_all();
    assert!(novelty.is_empty());
}
