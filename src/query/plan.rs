//! Query planning: source routing, pushdown extraction, and the
//! greedy join-ordering planner used when a query spans more than one
//! virtual-graph table. The native executor (`query::exec`) doesn't need a
//! plan at all — it just scans and joins in pattern order — so this module
//! is consumed by the virtual-graph engine (`crate::vg::exec`).

use std::collections::HashMap;

use crate::query::ast::{Expr, Literal, Pattern, Term, TriplePattern, Var};

/// A predicate recognized as pushable into a foreign table scan: one side
/// is a variable tied to that table's column, the other a bound literal
/// (or list of literals, for `IN`).
#[derive(Clone, Debug, PartialEq)]
pub enum Pushdown {
    Eq(Var, Literal),
    Ne(Var, Literal),
    Lt(Var, Literal),
    Le(Var, Literal),
    Gt(Var, Literal),
    Ge(Var, Literal),
    In(Var, Vec<Literal>),
    IsNull(Var),
    IsNotNull(Var),
}

/// Try to read `expr` as a pushable predicate over `var`. Only literal vs.
/// variable comparisons push down; variable-vs-variable or nested
/// expressions are left as residual filters.
fn as_pushdown(expr: &Expr) -> Option<Pushdown> {
    fn var_lit(a: &Expr, b: &Expr) -> Option<(Var, Literal)> {
        match (a, b) {
            (Expr::Var(v), Expr::Lit(l)) => Some((v.clone(), l.clone())),
            (Expr::Lit(l), Expr::Var(v)) => Some((v.clone(), l.clone())),
            _ => None,
        }
    }

    match expr {
        Expr::Eq(a, b) => var_lit(a, b).map(|(v, l)| Pushdown::Eq(v, l)),
        Expr::Ne(a, b) => var_lit(a, b).map(|(v, l)| Pushdown::Ne(v, l)),
        Expr::Lt(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Var(v), Expr::Lit(l)) => Some(Pushdown::Lt(v.clone(), l.clone())),
            (Expr::Lit(l), Expr::Var(v)) => Some(Pushdown::Gt(v.clone(), l.clone())),
            _ => None,
        },
        Expr::Le(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Var(v), Expr::Lit(l)) => Some(Pushdown::Le(v.clone(), l.clone())),
            (Expr::Lit(l), Expr::Var(v)) => Some(Pushdown::Ge(v.clone(), l.clone())),
            _ => None,
        },
        Expr::Gt(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Var(v), Expr::Lit(l)) => Some(Pushdown::Gt(v.clone(), l.clone())),
            (Expr::Lit(l), Expr::Var(v)) => Some(Pushdown::Lt(v.clone(), l.clone())),
            _ => None,
        },
        Expr::Ge(a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Var(v), Expr::Lit(l)) => Some(Pushdown::Ge(v.clone(), l.clone())),
            (Expr::Lit(l), Expr::Var(v)) => Some(Pushdown::Le(v.clone(), l.clone())),
            _ => None,
        },
        Expr::In(e, list) => match e.as_ref() {
            Expr::Var(v) => {
                let literals: Option<Vec<Literal>> = list
                    .iter()
                    .map(|x| match x {
                        Expr::Lit(l) => Some(l.clone()),
                        _ => None,
                    })
                    .collect();
                literals.map(|ls| Pushdown::In(v.clone(), ls))
            }
            _ => None,
        },
        Expr::IsNull(e) => match e.as_ref() {
            Expr::Var(v) => Some(Pushdown::IsNull(v.clone())),
            _ => None,
        },
        Expr::Not(inner) => match inner.as_ref() {
            Expr::IsNull(e) => match e.as_ref() {
                Expr::Var(v) => Some(Pushdown::IsNotNull(v.clone())),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Extract every pushable predicate from a pattern group's `Filter`
/// patterns, alongside the patterns that remain as residual (non-pushable)
/// filters once the pushable ones are pulled out.
pub fn extract_pushdowns(patterns: &[Pattern]) -> (Vec<Pushdown>, Vec<Pattern>) {
    let mut pushdowns = vec![];
    let mut residual = vec![];
    for pattern in patterns {
        match pattern {
            Pattern::Filter(expr) => match as_pushdown(expr) {
                Some(p) => pushdowns.push(p),
                None => residual.push(pattern.clone()),
            },
            other => residual.push(other.clone()),
        }
    }
    (pushdowns, residual)
}

/// Turn a `VALUES ?v { ... }` pattern whose variable is tied to a
/// source-native column into an `IN` pushdown, dropping it from the
/// residual plan. Only single-variable VALUES blocks push down this way;
/// multi-variable VALUES stay in the residual plan as an ordinary pattern.
pub fn extract_values_pushdown(patterns: &[Pattern]) -> (Vec<Pushdown>, Vec<Pattern>) {
    let mut pushdowns = vec![];
    let mut residual = vec![];
    for pattern in patterns {
        match pattern {
            Pattern::Values { vars, rows } if vars.len() == 1 => {
                let var = vars[0].clone();
                let literals: Vec<Literal> = rows.iter().filter_map(|r| r.first().cloned()).collect();
                pushdowns.push(Pushdown::In(var, literals));
            }
            other => residual.push(other.clone()),
        }
    }
    (pushdowns, residual)
}

/// One table in a multi-source join plan: the table alias, an estimated
/// row count, and the foreign-key edges to other tables that the query's
/// variables actually traverse (object var of this table's pattern equals
/// the subject var of the target table's pattern).
#[derive(Clone, Debug)]
pub struct JoinNode {
    pub alias: String,
    pub row_count: u64,
    /// Number of distinct values of the join key on this side, used by the
    /// `|R| * |S| / max(NDV(R.k), NDV(S.k))` cost estimate.
    pub ndv: HashMap<String, u64>,
}

#[derive(Clone, Debug)]
pub struct JoinEdge {
    pub left: String,
    pub right: String,
    pub key: String,
}

/// Greedy join order: start from the most selective table (lowest
/// `row_count`), then repeatedly add the reachable table with the smallest
/// estimated intermediate result.
pub fn greedy_join_order(nodes: &[JoinNode], edges: &[JoinEdge]) -> Vec<String> {
    if nodes.is_empty() {
        return vec![];
    }
    let mut remaining: HashMap<&str, &JoinNode> = nodes.iter().map(|n| (n.alias.as_str(), n)).collect();
    let start = nodes.iter().min_by_key(|n| n.row_count).unwrap();
    let mut order = vec![start.alias.clone()];
    let mut current_size = start.row_count;
    remaining.remove(start.alias.as_str());

    while !remaining.is_empty() {
        let mut best: Option<(String, u64)> = None;
        for edge in edges {
            let (in_order, candidate_alias) = if order.contains(&edge.left) && remaining.contains_key(edge.right.as_str()) {
                (true, edge.right.as_str())
            } else if order.contains(&edge.right) && remaining.contains_key(edge.left.as_str()) {
                (true, edge.left.as_str())
            } else {
                (false, "")
            };
            if !in_order {
                continue;
            }
            let candidate = remaining[candidate_alias];
            let ndv_left = candidate.ndv.get(&edge.key).copied().unwrap_or(1).max(1);
            let estimated = (current_size * candidate.row_count) / ndv_left.max(1);
            if best.as_ref().map(|(_, size)| estimated < *size).unwrap_or(true) {
                best = Some((candidate_alias.to_string(), estimated));
            }
        }

        let (next_alias, next_size) = match best {
            Some(b) => b,
            // No remaining table is reachable by a traversed FK edge —
            // fall back to the smallest remaining table (it joins by
            // Cartesian).
            None => {
                let smallest = remaining.values().min_by_key(|n| n.row_count).unwrap();
                (smallest.alias.clone(), current_size * smallest.row_count)
            }
        };
        current_size = next_size;
        order.push(next_alias.clone());
        remaining.remove(next_alias.as_str());
    }

    order
}

/// Does a child-side triple pattern traverse `edge`'s foreign key toward a
/// parent-side pattern: the child pattern's object variable equals the
/// parent pattern's subject variable.
pub fn traverses_edge(child: &TriplePattern, parent: &TriplePattern) -> bool {
    match (&child.o, &parent.s) {
        (Term::Var(o), Term::Var(s)) => o == s,
        _ => false,
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
