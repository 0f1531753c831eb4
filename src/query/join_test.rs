use super::*;
use crate::query::exec::BindingValue;

fn row(pairs: &[(&str, BindingValue)]) -> Binding {
    Binding(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
}

#[test]
fn hash_join_keeps_only_compatible_pairs() {
    let left = vec![row(&[("x", BindingValue::Int(1))]), row(&[("x", BindingValue::Int(2))])];
    let right = vec![
        row(&[("x", BindingValue::Int(1)), ("y", BindingValue::Int(10))]),
        row(&[("x", BindingValue::Int(3)), ("y", BindingValue::Int(30))]),
    ];
    let joined = hash_join(&left, &right, 1000).unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].0.get("y"), Some(&BindingValue::Int(10)));
}

#[test]
fn left_outer_join_keeps_unmatched_left_rows() {
    let left = vec![row(&[("x", BindingValue::Int(1))])];
    let right: Solution = vec![];
    let joined = left_outer_hash_join(&left, &right, 1000).unwrap();
    assert_eq!(joined, left);
}

#[test]
fn cartesian_guard_rejects_oversized_unrelated_joins() {
    let left: Solution = (0..200).map(|i| row(&[("x", BindingValue::Int(i))])).collect();
    let right: Solution = (0..200).map(|i| row(&[("y", BindingValue::Int(i))])).collect();
    let err = hash_join(&left, &right, 1000).unwrap_err();
    assert!(matches!(err, Error::CartesianTooLarge { .. }));
}

#[test]
fn minus_drops_rows_sharing_and_agreeing_on_a_variable() {
    let left = vec![row(&[("x", BindingValue::Int(1))]), row(&[("x", BindingValue::Int(2))])];
    let right = vec![row(&[("x", BindingValue::Int(1))])];
    let out = minus(&left, &right);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].0.get("x"), Some(&BindingValue::Int(2)));
}
