//! The native query executor: a single upfront scan of the `spot` order,
//! then synchronous pattern evaluation and join over the materialized
//! flakes. A precise per-pattern range bound would need a placeholder
//! object whose rank could sort wrong, the same problem `Ledger::live_values`
//! and `Ledger::history` already work around — so this executor scans
//! unbounded once and filters in memory rather than pushing bounds into the
//! tree walk.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Arc;

use futures::StreamExt;

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::flake::{Flake, IndexOrder, Object};
use crate::index::{NodeCache, Tree};
use crate::ledger::Db;
use crate::query::ast::{
    ClassPattern, Expr, GraphTarget, Literal, Pattern, Query, Term, TriplePattern, Var,
};
use crate::query::{join, modifiers};
use crate::sid::{split_iri, Namespaces, Sid};
use crate::store::Store;

const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// A binding value: either a subject reference or a coerced literal.
/// Isomorphic to [`Object`] but carries its own `Eq`/`Hash` so it can serve
/// as a hash-join key, which `Object`'s float field doesn't support.
#[derive(Clone, Debug)]
pub enum BindingValue {
    Ref(Sid),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(chrono::DateTime<chrono::Utc>),
}

impl PartialEq for BindingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BindingValue::Ref(a), BindingValue::Ref(b)) => a == b,
            (BindingValue::Str(a), BindingValue::Str(b)) => a == b,
            (BindingValue::Int(a), BindingValue::Int(b)) => a == b,
            (BindingValue::Float(a), BindingValue::Float(b)) => a.to_bits() == b.to_bits(),
            (BindingValue::Bool(a), BindingValue::Bool(b)) => a == b,
            (BindingValue::Time(a), BindingValue::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for BindingValue {}

impl std::hash::Hash for BindingValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            BindingValue::Ref(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            BindingValue::Str(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            BindingValue::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            BindingValue::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            BindingValue::Bool(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            BindingValue::Time(t) => {
                5u8.hash(state);
                t.hash(state);
            }
        }
    }
}

/// One row of variable bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Binding(pub HashMap<Var, BindingValue>);

/// A sequence of result rows — what a pattern group, and ultimately a whole
/// query, evaluates to.
pub type Solution = Vec<Binding>;

pub(crate) fn object_to_binding(o: &Object) -> BindingValue {
    match o {
        Object::Ref(s) => BindingValue::Ref(s.clone()),
        Object::Str(s) => BindingValue::Str(s.clone()),
        Object::Int(i) => BindingValue::Int(*i),
        Object::Float(f) => BindingValue::Float(*f),
        Object::Bool(b) => BindingValue::Bool(*b),
        Object::Time(t) => BindingValue::Time(*t),
    }
}

pub(crate) fn literal_to_binding(lit: &Literal) -> BindingValue {
    match lit {
        Literal::Str(s) => BindingValue::Str(s.clone()),
        Literal::Int(i) => BindingValue::Int(*i),
        Literal::Float(f) => BindingValue::Float(*f),
        Literal::Bool(b) => BindingValue::Bool(*b),
        Literal::Time(t) => BindingValue::Time(*t),
    }
}

pub(crate) fn resolve_sid(iri: &str, namespaces: &Namespaces) -> Option<Sid> {
    let (ns, local) = split_iri(iri);
    namespaces.lookup(ns).map(|code| Sid::new(code, local))
}

fn match_term(term: &Term, actual: BindingValue, namespaces: &Namespaces, binding: &mut Binding) -> bool {
    match term {
        Term::Var(v) => match binding.0.get(v) {
            Some(existing) => *existing == actual,
            None => {
                binding.0.insert(v.clone(), actual);
                true
            }
        },
        Term::Iri(iri) => match resolve_sid(iri, namespaces) {
            Some(sid) => actual == BindingValue::Ref(sid),
            None => false,
        },
        Term::Literal(lit) => literal_to_binding(lit) == actual,
    }
}

fn try_match_triple(pattern: &TriplePattern, flake: &Flake, namespaces: &Namespaces) -> Option<Binding> {
    let mut binding = Binding::default();
    if !match_term(&pattern.s, BindingValue::Ref(flake.s.clone()), namespaces, &mut binding) {
        return None;
    }
    if !match_term(&pattern.p, BindingValue::Ref(flake.p.clone()), namespaces, &mut binding) {
        return None;
    }
    if !match_term(&pattern.o, object_to_binding(&flake.o), namespaces, &mut binding) {
        return None;
    }
    Some(binding)
}

pub(crate) fn class_as_triple(class: &ClassPattern) -> TriplePattern {
    TriplePattern {
        s: class.s.clone(),
        p: Term::Iri(RDF_TYPE_IRI.to_string()),
        o: Term::Iri(class.class.clone()),
    }
}

pub(crate) fn compare_values(a: &BindingValue, b: &BindingValue) -> Option<Ordering> {
    match (a, b) {
        (BindingValue::Ref(x), BindingValue::Ref(y)) => Some(x.cmp(y)),
        (BindingValue::Str(x), BindingValue::Str(y)) => Some(x.cmp(y)),
        (BindingValue::Int(x), BindingValue::Int(y)) => Some(x.cmp(y)),
        (BindingValue::Int(x), BindingValue::Float(y)) => (*x as f64).partial_cmp(y),
        (BindingValue::Float(x), BindingValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (BindingValue::Float(x), BindingValue::Float(y)) => x.partial_cmp(y),
        (BindingValue::Bool(x), BindingValue::Bool(y)) => Some(x.cmp(y)),
        (BindingValue::Time(x), BindingValue::Time(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Evaluate an expression to a value; an unbound variable or a type
/// mismatch a comparison can't resolve yields `None`, not an error — SPARQL
/// treats both as "unbound" rather than aborting the query.
pub(crate) fn eval_value(expr: &Expr, row: &Binding) -> Option<BindingValue> {
    match expr {
        Expr::Var(v) => row.0.get(v).cloned(),
        Expr::Lit(l) => Some(literal_to_binding(l)),
        Expr::Eq(a, b) => {
            let eq = match (eval_value(a, row), eval_value(b, row)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            };
            Some(BindingValue::Bool(eq))
        }
        Expr::Ne(a, b) => {
            let eq = match (eval_value(a, row), eval_value(b, row)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            };
            Some(BindingValue::Bool(!eq))
        }
        Expr::Lt(a, b) => Some(BindingValue::Bool(ordered(a, b, row, |o| o == Ordering::Less))),
        Expr::Le(a, b) => Some(BindingValue::Bool(ordered(a, b, row, |o| o != Ordering::Greater))),
        Expr::Gt(a, b) => Some(BindingValue::Bool(ordered(a, b, row, |o| o == Ordering::Greater))),
        Expr::Ge(a, b) => Some(BindingValue::Bool(ordered(a, b, row, |o| o != Ordering::Less))),
        Expr::In(e, list) => {
            let v = eval_value(e, row);
            let found = v.is_some() && list.iter().any(|candidate| eval_value(candidate, row) == v);
            Some(BindingValue::Bool(found))
        }
        Expr::And(a, b) => Some(BindingValue::Bool(eval_bool(a, row) && eval_bool(b, row))),
        Expr::Or(a, b) => Some(BindingValue::Bool(eval_bool(a, row) || eval_bool(b, row))),
        Expr::Not(a) => Some(BindingValue::Bool(!eval_bool(a, row))),
        Expr::IsNull(a) => Some(BindingValue::Bool(eval_value(a, row).is_none())),
    }
}

fn ordered(a: &Expr, b: &Expr, row: &Binding, pass: impl Fn(Ordering) -> bool) -> bool {
    match (eval_value(a, row), eval_value(b, row)) {
        (Some(x), Some(y)) => compare_values(&x, &y).map(pass).unwrap_or(false),
        _ => false,
    }
}

pub(crate) fn eval_bool(expr: &Expr, row: &Binding) -> bool {
    matches!(eval_value(expr, row), Some(BindingValue::Bool(true)))
}

/// Everything a pattern group needs to evaluate against: the materialized
/// native flake set (or, for a virtual graph, the translated per-table
/// rows already shaped as [`Binding`]s upstream), the namespace table for
/// resolving `Term::Iri`, and the Cartesian guard threshold.
pub(crate) struct Ctx<'a> {
    pub flakes: &'a [Flake],
    pub namespaces: &'a Namespaces,
    pub max_cartesian_product_size: u64,
}

pub(crate) fn eval_patterns(patterns: &[Pattern], ctx: &Ctx) -> Result<Solution> {
    let mut acc: Solution = vec![Binding::default()];
    for pattern in patterns {
        acc = eval_pattern(pattern, acc, ctx)?;
    }
    Ok(acc)
}

pub(crate) fn eval_pattern(pattern: &Pattern, acc: Solution, ctx: &Ctx) -> Result<Solution> {
    match pattern {
        Pattern::Triple(tp) => {
            let candidates: Solution = ctx
                .flakes
                .iter()
                .filter_map(|f| try_match_triple(tp, f, ctx.namespaces))
                .collect();
            join::hash_join(&acc, &candidates, ctx.max_cartesian_product_size)
        }
        Pattern::Class(cp) => {
            let tp = class_as_triple(cp);
            let candidates: Solution = ctx
                .flakes
                .iter()
                .filter_map(|f| try_match_triple(&tp, f, ctx.namespaces))
                .collect();
            join::hash_join(&acc, &candidates, ctx.max_cartesian_product_size)
        }
        Pattern::Filter(expr) => Ok(acc.into_iter().filter(|row| eval_bool(expr, row)).collect()),
        Pattern::Bind { var, expr } => Ok(acc
            .into_iter()
            .map(|mut row| {
                if let Some(v) = eval_value(expr, &row) {
                    row.0.insert(var.clone(), v);
                }
                row
            })
            .collect()),
        Pattern::Optional(sub) => {
            let inner = eval_patterns(sub, ctx)?;
            join::left_outer_hash_join(&acc, &inner, ctx.max_cartesian_product_size)
        }
        Pattern::Union(branches) => {
            let mut union_solution = vec![];
            for branch in branches {
                union_solution.extend(eval_patterns(branch, ctx)?);
            }
            join::hash_join(&acc, &union_solution, ctx.max_cartesian_product_size)
        }
        Pattern::Minus(sub) => {
            let inner = eval_patterns(sub, ctx)?;
            Ok(join::minus(&acc, &inner))
        }
        Pattern::Exists(sub) => {
            let inner = eval_patterns(sub, ctx)?;
            Ok(join::exists_filter(&acc, &inner, false))
        }
        Pattern::NotExists(sub) => {
            let inner = eval_patterns(sub, ctx)?;
            Ok(join::exists_filter(&acc, &inner, true))
        }
        Pattern::Values { vars, rows } => {
            let values_solution: Solution = rows
                .iter()
                .map(|row_values| {
                    let mut binding = Binding::default();
                    for (var, lit) in vars.iter().zip(row_values.iter()) {
                        binding.0.insert(var.clone(), literal_to_binding(lit));
                    }
                    binding
                })
                .collect();
            join::hash_join(&acc, &values_solution, ctx.max_cartesian_product_size)
        }
        Pattern::SubSelect(sub_query) => {
            let sub_solution = eval_query(sub_query, ctx)?;
            join::hash_join(&acc, &sub_solution, ctx.max_cartesian_product_size)
        }
    }
}

/// Evaluate a whole query (pattern group plus solution modifiers) against
/// an already-assembled [`Ctx`] — shared by top-level queries and
/// sub-selects alike.
pub(crate) fn eval_query(query: &Query, ctx: &Ctx) -> Result<Solution> {
    let joined = eval_patterns(&query.where_, ctx)?;
    modifiers::apply(query, joined)
}

/// Run a query against `db`'s native index: one async scan of the `spot`
/// order materializes every live flake as of `db.t`, then the rest of
/// evaluation is synchronous over that slice.
#[tracing::instrument(level = "debug", skip(store, cache, db, query, config), fields(t = db.t))]
pub async fn execute(
    store: Arc<dyn Store>,
    cache: Arc<NodeCache>,
    db: &Db,
    query: &Query,
    config: &LedgerConfig,
) -> Result<Solution> {
    match &query.from {
        GraphTarget::Native => {
            let tree = Tree::new(store, IndexOrder::Spot, cache, db.root_for(IndexOrder::Spot));
            let mut flakes = vec![];
            let mut stream = tree.scan(&db.novelty, db.t, Bound::Unbounded, Bound::Unbounded);
            while let Some(item) = stream.next().await {
                flakes.push(item?);
            }
            tracing::trace!(scanned = flakes.len(), "materialized spot scan for query");
            let ctx = Ctx {
                flakes: &flakes,
                namespaces: &db.namespaces,
                max_cartesian_product_size: config.max_cartesian_product_size,
            };
            let solution = eval_query(query, &ctx)?;
            tracing::info!(rows = solution.len(), "query complete");
            Ok(solution)
        }
        GraphTarget::Virtual(_) | GraphTarget::Multi(_) => Err(Error::validation(
            "virtual graph queries are executed through the virtual-graph engine, not Ledger::query",
        )),
    }
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod exec_test;
