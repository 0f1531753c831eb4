//! Solution modifiers applied after pattern evaluation: GROUP BY +
//! aggregates, then HAVING, then projection to the selected variables,
//! then DISTINCT (deduplicating the projected tuple), then ORDER BY, then
//! LIMIT/OFFSET.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::query::ast::{Aggregate, AggregateKind, Query, SortDirection, Var};
use crate::query::exec::{compare_values, eval_bool, Binding, BindingValue, Solution};

pub fn apply(query: &Query, solution: Solution) -> Result<Solution> {
    let grouped = group_and_aggregate(query, solution);
    let having = apply_having(query, grouped);
    // DISTINCT dedups on the selected tuple, so projection happens first.
    let projected = apply_projection(query, having);
    let distinct = apply_distinct(query, projected);
    let ordered = apply_order_by(query, distinct);
    Ok(apply_limit_offset(query, ordered))
}

fn group_key(row: &Binding, group_by: &[Var]) -> Vec<Option<BindingValue>> {
    group_by.iter().map(|v| row.0.get(v).cloned()).collect()
}

fn bound_values<'a>(rows: &'a [Binding], var: &Var) -> Vec<&'a BindingValue> {
    rows.iter().filter_map(|r| r.0.get(var)).collect()
}

fn as_f64(v: &BindingValue) -> Option<f64> {
    match v {
        BindingValue::Int(i) => Some(*i as f64),
        BindingValue::Float(f) => Some(*f),
        _ => None,
    }
}

fn distinct_row_count(rows: &[Binding]) -> usize {
    let mut seen: Vec<&Binding> = vec![];
    for row in rows {
        if !seen.iter().any(|s| **s == *row) {
            seen.push(row);
        }
    }
    seen.len()
}

/// One aggregate's value over `rows`, or `None` for the SPARQL-style "no
/// rows contributed a value" null (AVG/MIN/MAX over an empty group).
fn aggregate_value(agg: &Aggregate, rows: &[Binding]) -> Option<BindingValue> {
    match agg.kind {
        AggregateKind::Count => {
            let n = match &agg.arg {
                Some(v) => bound_values(rows, v).len(),
                None => rows.len(),
            };
            Some(BindingValue::Int(n as i64))
        }
        AggregateKind::CountDistinct => {
            let n = match &agg.arg {
                Some(v) => {
                    let set: HashSet<BindingValue> = bound_values(rows, v).into_iter().cloned().collect();
                    set.len()
                }
                None => distinct_row_count(rows),
            };
            Some(BindingValue::Int(n as i64))
        }
        AggregateKind::Sum => {
            let values: Vec<&BindingValue> = agg.arg.as_ref().map(|v| bound_values(rows, v)).unwrap_or_default();
            if values.is_empty() {
                return Some(BindingValue::Int(0));
            }
            let all_int = values.iter().all(|v| matches!(v, BindingValue::Int(_)));
            let total: f64 = values.iter().filter_map(|v| as_f64(v)).sum();
            Some(if all_int {
                BindingValue::Int(total as i64)
            } else {
                BindingValue::Float(total)
            })
        }
        AggregateKind::Avg => {
            let values: Vec<&BindingValue> = agg.arg.as_ref().map(|v| bound_values(rows, v)).unwrap_or_default();
            if values.is_empty() {
                return None;
            }
            let total: f64 = values.iter().filter_map(|v| as_f64(v)).sum();
            Some(BindingValue::Float(total / values.len() as f64))
        }
        AggregateKind::Min => {
            let values: Vec<&BindingValue> = agg.arg.as_ref().map(|v| bound_values(rows, v)).unwrap_or_default();
            values
                .into_iter()
                .min_by(|a, b| compare_values(a, b).unwrap_or(Ordering::Equal))
                .cloned()
        }
        AggregateKind::Max => {
            let values: Vec<&BindingValue> = agg.arg.as_ref().map(|v| bound_values(rows, v)).unwrap_or_default();
            values
                .into_iter()
                .max_by(|a, b| compare_values(a, b).unwrap_or(Ordering::Equal))
                .cloned()
        }
    }
}

fn group_and_aggregate(query: &Query, solution: Solution) -> Solution {
    if query.aggregates.is_empty() {
        return solution;
    }

    if query.group_by.is_empty() {
        let mut row = Binding::default();
        for agg in &query.aggregates {
            if let Some(value) = aggregate_value(agg, &solution) {
                row.0.insert(agg.alias.clone(), value);
            }
        }
        return vec![row];
    }

    let mut order: Vec<Vec<Option<BindingValue>>> = vec![];
    let mut groups: HashMap<Vec<Option<BindingValue>>, Vec<Binding>> = HashMap::new();
    for row in solution {
        let key = group_key(&row, &query.group_by);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    order
        .into_iter()
        .map(|key| {
            let rows = &groups[&key];
            let mut out = Binding::default();
            for (var, value) in query.group_by.iter().zip(key.iter()) {
                if let Some(v) = value {
                    out.0.insert(var.clone(), v.clone());
                }
            }
            for agg in &query.aggregates {
                if let Some(value) = aggregate_value(agg, rows) {
                    out.0.insert(agg.alias.clone(), value);
                }
            }
            out
        })
        .collect()
}

fn apply_having(query: &Query, solution: Solution) -> Solution {
    match &query.having {
        Some(expr) => solution.into_iter().filter(|row| eval_bool(expr, row)).collect(),
        None => solution,
    }
}

fn apply_distinct(query: &Query, solution: Solution) -> Solution {
    if !query.distinct {
        return solution;
    }
    let mut out: Solution = vec![];
    for row in solution {
        if !out.contains(&row) {
            out.push(row);
        }
    }
    out
}

fn apply_order_by(query: &Query, mut solution: Solution) -> Solution {
    if query.order_by.is_empty() {
        return solution;
    }
    solution.sort_by(|a, b| {
        for key in &query.order_by {
            let av = a.0.get(&key.var);
            let bv = b.0.get(&key.var);
            let ord = match (av, bv) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = if key.direction == SortDirection::Desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    solution
}

fn apply_limit_offset(query: &Query, solution: Solution) -> Solution {
    let offset = query.offset.unwrap_or(0) as usize;
    let iter = solution.into_iter().skip(offset);
    match query.limit {
        Some(limit) => iter.take(limit as usize).collect(),
        None => iter.collect(),
    }
}

/// Drop every binding not named in `query.select` — an empty select list is
/// treated as "select everything" (the `SELECT *` shape).
fn apply_projection(query: &Query, solution: Solution) -> Solution {
    if query.select.is_empty() {
        return solution;
    }
    solution
        .into_iter()
        .map(|row| {
            let mut out = Binding::default();
            for var in &query.select {
                if let Some(v) = row.0.get(var) {
                    out.0.insert(var.clone(), v.clone());
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
#[path = "modifiers_test.rs"]
mod modifiers_test;
