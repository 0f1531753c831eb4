//! R2RML-like mapping contract: how one foreign table is exposed as a
//! (possibly partial) RDF view, plus the registry indexes the query planner
//! routes patterns through.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::error::{Error, Result};

/// `{type: :column, value: <col>, datatype: <xsd>, language?: <tag>}`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMapping {
    pub column: String,
    pub datatype: String,
    pub language: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinCondition {
    pub child: String,
    pub parent: String,
}

/// `{type: :ref, parent-triples-map: <IRI>, join-conditions: [...]}` — a
/// `RefObjectMap` edge to another table's triples map.
#[derive(Clone, Debug, PartialEq)]
pub struct RefMapping {
    pub parent_triples_map: String,
    pub join_conditions: Vec<JoinCondition>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PredicateMapping {
    Column(ColumnMapping),
    Ref(RefMapping),
}

/// One table's mapping: a subject IRI template, an optional class, and the
/// predicate→column/ref map.
#[derive(Clone, Debug, PartialEq)]
pub struct TriplesMap {
    pub iri: String,
    pub table: String,
    pub subject_template: String,
    pub class: Option<String>,
    pub predicates: BTreeMap<String, PredicateMapping>,
}

fn placeholder_re() -> Regex {
    Regex::new(r"\{([^}]+)\}").expect("static placeholder pattern is valid regex")
}

impl TriplesMap {
    /// Column names referenced by `{col}` placeholders in the subject
    /// template, in template order (may repeat).
    pub fn subject_columns(&self) -> Vec<String> {
        placeholder_re()
            .captures_iter(&self.subject_template)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Substitute `row`'s column values into the subject template,
    /// producing the subject IRI for that row.
    pub fn build_subject(&self, row: &HashMap<String, String>) -> Result<String> {
        let re = placeholder_re();
        let mut missing = None;
        let iri = re.replace_all(&self.subject_template, |caps: &regex::Captures| {
            let col = &caps[1];
            match row.get(col) {
                Some(v) => v.clone(),
                None => {
                    missing = Some(col.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(col) => Err(Error::validation(format!(
                "subject template for {} references missing column {}",
                self.iri, col
            ))),
            None => Ok(iri.into_owned()),
        }
    }
}

/// The registry's class/predicate/table indexes, built once from a set of
/// `TriplesMap`s.
#[derive(Clone, Debug, Default)]
pub struct MappingRegistry {
    maps: BTreeMap<String, TriplesMap>,
    by_class: HashMap<String, String>,
    by_predicate: HashMap<String, Vec<String>>,
}

impl MappingRegistry {
    pub fn new() -> MappingRegistry {
        MappingRegistry::default()
    }

    pub fn register(&mut self, map: TriplesMap) {
        if let Some(class) = &map.class {
            self.by_class.insert(class.clone(), map.iri.clone());
        }
        for predicate in map.predicates.keys() {
            self.by_predicate.entry(predicate.clone()).or_default().push(map.iri.clone());
        }
        self.maps.insert(map.iri.clone(), map);
    }

    pub fn get(&self, triples_map_iri: &str) -> Option<&TriplesMap> {
        self.maps.get(triples_map_iri)
    }

    pub fn by_class(&self, class: &str) -> Option<&TriplesMap> {
        self.by_class.get(class).and_then(|iri| self.maps.get(iri))
    }

    pub fn by_predicate(&self, predicate: &str) -> Vec<&TriplesMap> {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .filter_map(|iri| self.maps.get(iri))
            .collect()
    }

    /// `triples-map-IRI → table`, used to resolve a `RefObjectMap`'s parent
    /// side back to the table it scans.
    pub fn table_for(&self, triples_map_iri: &str) -> Option<&str> {
        self.maps.get(triples_map_iri).map(|m| m.table.as_str())
    }
}

#[cfg(test)]
#[path = "mapping_test.rs"]
mod mapping_test;
