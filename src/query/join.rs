//! Generic join primitives over solution rows. These operate purely on
//! variable bindings — callers supply the rows, this module only knows how
//! to combine or filter them.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::query::ast::Var;
use crate::query::exec::{Binding, Solution};

/// Variables bound in both `left` and `right`'s first rows (or `&[]`/empty
/// iterators if either side has no rows — callers only join non-empty
/// sides, so this is purely descriptive).
pub fn shared_vars(left_vars: &HashSet<Var>, right_vars: &HashSet<Var>) -> Vec<Var> {
    left_vars.intersection(right_vars).cloned().collect()
}

fn vars_of(rows: &[Binding]) -> HashSet<Var> {
    rows.iter().flat_map(|r| r.0.keys().cloned()).collect()
}

/// Two bindings are compatible if every variable they share carries the
/// same value.
pub fn compatible(a: &Binding, b: &Binding) -> bool {
    for (var, value) in &a.0 {
        if let Some(other) = b.0.get(var) {
            if other != value {
                return false;
            }
        }
    }
    true
}

/// Union of two compatible bindings' variables, `b`'s value winning no
/// ties since compatibility already guarantees agreement.
pub fn merge(a: &Binding, b: &Binding) -> Binding {
    let mut out = a.clone();
    for (var, value) in &b.0 {
        out.0.insert(var.clone(), value.clone());
    }
    out
}

/// Estimated cartesian cost for a guard that has no cardinality estimates
/// of its own: just the row-count product.
fn estimate(left: &[Binding], right: &[Binding]) -> u64 {
    left.len() as u64 * right.len() as u64
}

/// Inner hash join on the variables `left` and `right` share. If they share
/// no variables, every pair is a Cartesian candidate — guarded by
/// `max_cartesian_product_size` since that's unbounded by construction.
pub fn hash_join(left: &Solution, right: &Solution, max_cartesian_product_size: u64) -> Result<Solution> {
    let left_vars = vars_of(left);
    let right_vars = vars_of(right);
    let shared = shared_vars(&left_vars, &right_vars);

    if shared.is_empty() {
        let estimated = estimate(left, right);
        if estimated > max_cartesian_product_size {
            return Err(Error::cartesian_too_large(
                format!("{} rows", left.len()),
                format!("{} rows", right.len()),
                estimated,
                max_cartesian_product_size,
            ));
        }
        let mut out = vec![];
        for l in left {
            for r in right {
                out.push(merge(l, r));
            }
        }
        return Ok(out);
    }

    let mut index: HashMap<Vec<Option<crate::query::exec::BindingValue>>, Vec<&Binding>> = HashMap::new();
    for row in right {
        let key: Vec<_> = shared.iter().map(|v| row.0.get(v).cloned()).collect();
        index.entry(key).or_default().push(row);
    }

    let mut out = vec![];
    for l in left {
        let key: Vec<_> = shared.iter().map(|v| l.0.get(v).cloned()).collect();
        if let Some(candidates) = index.get(&key) {
            for r in candidates {
                if compatible(l, r) {
                    out.push(merge(l, r));
                }
            }
        }
    }
    Ok(out)
}

/// Left outer join: every `left` row survives, merged with each compatible
/// `right` row, or carried through unmatched if none match — the shape
/// `OPTIONAL { ... }` needs.
pub fn left_outer_hash_join(left: &Solution, right: &Solution, max_cartesian_product_size: u64) -> Result<Solution> {
    let left_vars = vars_of(left);
    let right_vars = vars_of(right);
    let shared = shared_vars(&left_vars, &right_vars);

    if shared.is_empty() {
        let estimated = estimate(left, right);
        if estimated > max_cartesian_product_size && !right.is_empty() {
            return Err(Error::cartesian_too_large(
                format!("{} rows", left.len()),
                format!("{} rows", right.len()),
                estimated,
                max_cartesian_product_size,
            ));
        }
        let mut out = vec![];
        for l in left {
            if right.is_empty() {
                out.push(l.clone());
                continue;
            }
            for r in right {
                out.push(merge(l, r));
            }
        }
        return Ok(out);
    }

    let mut index: HashMap<Vec<Option<crate::query::exec::BindingValue>>, Vec<&Binding>> = HashMap::new();
    for row in right {
        let key: Vec<_> = shared.iter().map(|v| row.0.get(v).cloned()).collect();
        index.entry(key).or_default().push(row);
    }

    let mut out = vec![];
    for l in left {
        let key: Vec<_> = shared.iter().map(|v| l.0.get(v).cloned()).collect();
        let matches: Vec<&&Binding> = index
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|r| compatible(l, r))
            .collect();
        if matches.is_empty() {
            out.push(l.clone());
        } else {
            for r in matches {
                out.push(merge(l, r));
            }
        }
    }
    Ok(out)
}

/// `MINUS`: drop every `left` row that shares at least one variable with a
/// `right` row and agrees with it on every shared variable. Rows sharing no
/// variables with any `right` row are unaffected, per SPARQL MINUS
/// semantics.
pub fn minus(left: &Solution, right: &Solution) -> Solution {
    left.iter()
        .filter(|l| {
            !right.iter().any(|r| {
                let shared_nonempty = l.0.keys().any(|v| r.0.contains_key(v));
                shared_nonempty && compatible(l, r)
            })
        })
        .cloned()
        .collect()
}

/// `EXISTS`/`NOT EXISTS`: keep (or drop, if `negate`) rows of `left` for
/// which some row of `right` is compatible.
pub fn exists_filter(left: &Solution, right: &Solution, negate: bool) -> Solution {
    left.iter()
        .filter(|l| {
            let matched = right.iter().any(|r| compatible(l, r));
            matched != negate
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "join_test.rs"]
mod join_test;
