use super::*;
use crate::query::ast::Expr;

#[test]
fn equality_filter_on_var_and_literal_pushes_down() {
    let patterns = vec![Pattern::Filter(Expr::Eq(
        Box::new(Expr::Var("age".into())),
        Box::new(Expr::Lit(Literal::Int(30))),
    ))];
    let (pushdowns, residual) = extract_pushdowns(&patterns);
    assert_eq!(pushdowns, vec![Pushdown::Eq("age".into(), Literal::Int(30))]);
    assert!(residual.is_empty());
}

#[test]
fn comparison_between_two_variables_stays_residual() {
    let patterns = vec![Pattern::Filter(Expr::Lt(
        Box::new(Expr::Var("a".into())),
        Box::new(Expr::Var("b".into())),
    ))];
    let (pushdowns, residual) = extract_pushdowns(&patterns);
    assert!(pushdowns.is_empty());
    assert_eq!(residual.len(), 1);
}

#[test]
fn single_var_values_becomes_in_pushdown() {
    let patterns = vec![Pattern::Values {
        vars: vec!["id".into()],
        rows: vec![vec![Literal::Int(1)], vec![Literal::Int(2)]],
    }];
    let (pushdowns, residual) = extract_values_pushdown(&patterns);
    assert_eq!(pushdowns, vec![Pushdown::In("id".into(), vec![Literal::Int(1), Literal::Int(2)])]);
    assert!(residual.is_empty());
}

#[test]
fn greedy_join_order_starts_from_smallest_table() {
    let nodes = vec![
        JoinNode { alias: "big".into(), row_count: 10_000, ndv: HashMap::new() },
        JoinNode { alias: "small".into(), row_count: 10, ndv: HashMap::new() },
    ];
    let edges = vec![JoinEdge { left: "small".into(), right: "big".into(), key: "id".into() }];
    let order = greedy_join_order(&nodes, &edges);
    assert_eq!(order[0], "small");
}
