//! Virtual graph query execution: route pattern groups to foreign tables
//! by their R2RML-like mapping, push down filters, scan, and join.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::query::ast::{Pattern, Query, Term, TriplePattern, Var};
use crate::query::exec::{Binding, BindingValue, Ctx};
use crate::query::plan::{self, Pushdown};
use crate::query::{join, modifiers};
use crate::sid::Namespaces;
use crate::vg::mapping::{MappingRegistry, PredicateMapping, TriplesMap};

/// One foreign table cell. `Null` stands for SQL NULL / an absent column.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

pub type Row = HashMap<String, CellValue>;

/// The seam between the virtual-graph engine and an actual foreign data
/// source (a SQL database, a CSV loader, whatever backs a given mapping).
/// `filters` have already been translated from query variables to that
/// table's column names — implementations are free to push them into a
/// `WHERE` clause or just filter the materialized rows.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn scan(&self, table: &str, filters: &[Pushdown]) -> Result<Vec<Row>>;
}

fn cell_to_binding(cell: &CellValue) -> Option<BindingValue> {
    match cell {
        CellValue::Str(s) => Some(BindingValue::Str(s.clone())),
        CellValue::Int(i) => Some(BindingValue::Int(*i)),
        CellValue::Float(f) => Some(BindingValue::Float(*f)),
        CellValue::Bool(b) => Some(BindingValue::Bool(*b)),
        CellValue::Null => None,
    }
}

fn cell_to_string(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Str(s) => Some(s.clone()),
        CellValue::Int(i) => Some(i.to_string()),
        CellValue::Float(f) => Some(f.to_string()),
        CellValue::Bool(b) => Some(b.to_string()),
        CellValue::Null => None,
    }
}

fn row_to_strings(row: &Row) -> HashMap<String, String> {
    row.iter().filter_map(|(k, v)| cell_to_string(v).map(|s| (k.clone(), s))).collect()
}

/// Translate one table's routed patterns plus one scanned row into a
/// binding: the row's subject IRI (bound wherever the pattern's subject is
/// a variable), and one binding per object variable whose predicate maps
/// to a column present in the row.
fn row_to_binding(map: &TriplesMap, row: &Row, patterns: &[TriplePattern]) -> Result<Binding> {
    let mut binding = Binding::default();
    let subject_iri = map.build_subject(&row_to_strings(row))?;

    for pattern in patterns {
        if let Term::Var(v) = &pattern.s {
            binding.0.insert(v.clone(), BindingValue::Str(subject_iri.clone()));
        }
        let predicate_iri = match &pattern.p {
            Term::Iri(iri) => iri,
            _ => continue,
        };
        let Some(PredicateMapping::Column(col)) = map.predicates.get(predicate_iri) else {
            continue;
        };
        if let Term::Var(v) = &pattern.o {
            if let Some(cell) = row.get(&col.column) {
                if let Some(value) = cell_to_binding(cell) {
                    binding.0.insert(v.clone(), value);
                }
            }
        }
    }
    Ok(binding)
}

fn class_as_triple(s: &Term, class: &str) -> TriplePattern {
    TriplePattern {
        s: s.clone(),
        p: Term::Iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type".to_string()),
        o: Term::Iri(class.to_string()),
    }
}

/// Assign each triple/class pattern to the mapping its class or predicate
/// resolves to; everything else (filters, binds, optionals, ...) is left
/// as residual, to be evaluated after the per-table solutions are joined.
fn route_patterns(registry: &MappingRegistry, patterns: &[Pattern]) -> (HashMap<String, Vec<TriplePattern>>, Vec<Pattern>) {
    let mut routed: HashMap<String, Vec<TriplePattern>> = HashMap::new();
    let mut residual = vec![];
    for pattern in patterns {
        match pattern {
            Pattern::Class(cp) => match registry.by_class(&cp.class) {
                Some(map) => routed.entry(map.iri.clone()).or_default().push(class_as_triple(&cp.s, &cp.class)),
                None => residual.push(pattern.clone()),
            },
            Pattern::Triple(tp) => match &tp.p {
                Term::Iri(iri) => match registry.by_predicate(iri).first() {
                    Some(map) => routed.entry(map.iri.clone()).or_default().push(tp.clone()),
                    None => residual.push(pattern.clone()),
                },
                _ => residual.push(pattern.clone()),
            },
            other => residual.push(other.clone()),
        }
    }
    (routed, residual)
}

/// Remap pushdowns from query-variable names to the column names of
/// `map`'s table, keeping only those whose variable is actually bound by
/// one of `patterns`' object positions to a column on this table.
fn translate_pushdowns_for_table(patterns: &[TriplePattern], map: &TriplesMap, pushdowns: &[Pushdown]) -> Vec<Pushdown> {
    let mut var_to_column: HashMap<&str, &str> = HashMap::new();
    for pattern in patterns {
        if let (Term::Var(v), Term::Iri(pred)) = (&pattern.o, &pattern.p) {
            if let Some(PredicateMapping::Column(col)) = map.predicates.get(pred) {
                var_to_column.insert(v.as_str(), col.column.as_str());
            }
        }
    }
    let remap = |v: &Var| var_to_column.get(v.as_str()).map(|c| c.to_string());
    pushdowns
        .iter()
        .filter_map(|pd| match pd {
            Pushdown::Eq(v, l) => remap(v).map(|c| Pushdown::Eq(c, l.clone())),
            Pushdown::Ne(v, l) => remap(v).map(|c| Pushdown::Ne(c, l.clone())),
            Pushdown::Lt(v, l) => remap(v).map(|c| Pushdown::Lt(c, l.clone())),
            Pushdown::Le(v, l) => remap(v).map(|c| Pushdown::Le(c, l.clone())),
            Pushdown::Gt(v, l) => remap(v).map(|c| Pushdown::Gt(c, l.clone())),
            Pushdown::Ge(v, l) => remap(v).map(|c| Pushdown::Ge(c, l.clone())),
            Pushdown::In(v, ls) => remap(v).map(|c| Pushdown::In(c, ls.clone())),
            Pushdown::IsNull(v) => remap(v).map(Pushdown::IsNull),
            Pushdown::IsNotNull(v) => remap(v).map(Pushdown::IsNotNull),
        })
        .collect()
}

/// Run a query whose `from` targets one or more virtual graphs: route
/// patterns to tables, scan each with its pushed-down filters, join the
/// per-table solutions (hash join if the query traverses a shared
/// variable — which is exactly when a `RefObjectMap` edge is actually
/// used — Cartesian otherwise, bounded by `max_cartesian_product_size`),
/// then apply any residual patterns and the query's solution modifiers.
pub async fn execute(registry: &MappingRegistry, tables: &dyn TableSource, query: &Query) -> Result<crate::query::exec::Solution> {
    let (routed, residual) = route_patterns(registry, &query.where_);
    if routed.is_empty() {
        return Err(Error::validation(
            "no pattern in this query routes to a known virtual-graph mapping",
        ));
    }

    let (mut pushdowns, residual) = plan::extract_pushdowns(&residual);
    let (values_pushdowns, residual) = plan::extract_values_pushdown(&residual);
    pushdowns.extend(values_pushdowns);

    let max_cartesian = 100_000;
    let mut per_table: HashMap<String, crate::query::exec::Solution> = HashMap::new();
    for (map_iri, patterns) in &routed {
        let map = registry.get(map_iri).expect("routed against a mapping present in the registry");
        let table_pushdowns = translate_pushdowns_for_table(patterns, map, &pushdowns);
        let rows = tables.scan(&map.table, &table_pushdowns).await?;
        let solution: Result<crate::query::exec::Solution> = rows.iter().map(|row| row_to_binding(map, row, patterns)).collect();
        per_table.insert(map_iri.clone(), solution?);
    }

    let mut map_iris: Vec<String> = per_table.keys().cloned().collect();
    map_iris.sort();
    let mut acc = per_table.remove(&map_iris[0]).unwrap_or_default();
    for map_iri in &map_iris[1..] {
        let next = per_table.remove(map_iri).unwrap_or_default();
        acc = join::hash_join(&acc, &next, max_cartesian)?;
    }

    let empty_namespaces = Namespaces::new();
    let ctx = Ctx {
        flakes: &[],
        namespaces: &empty_namespaces,
        max_cartesian_product_size: max_cartesian,
    };
    let mut solution = acc;
    for pattern in &residual {
        solution = crate::query::exec::eval_pattern(pattern, solution, &ctx)?;
    }

    modifiers::apply(query, solution)
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod exec_test;
