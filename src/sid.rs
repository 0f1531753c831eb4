//! Subject identifiers and the per-ledger namespace code table.
//!
//! Every IRI used inside a ledger is interned into a [`Sid`]: a namespace
//! code (a small integer, stable for the ledger's lifetime) paired with a
//! local name. Flakes and index keys only ever carry `Sid`s, never raw IRI
//! strings — this is what lets the index tree's comparators stay cheap.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `(namespace-code, local-name)`. Ordered first by namespace code, then
/// lexicographically by local name — this is the ordering every index
/// comparator in [`crate::flake`] falls back to for the `s`/`p`/`o` slots.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sid {
    pub ns: u32,
    pub local: String,
}

impl Sid {
    pub fn new(ns: u32, local: impl Into<String>) -> Sid {
        Sid {
            ns,
            local: local.into(),
        }
    }
}

impl PartialOrd for Sid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ns.cmp(&other.ns).then_with(|| self.local.cmp(&other.local))
    }
}

/// Append-only map between namespace codes and the IRI prefixes they stand
/// for. Persisted verbatim in the index root payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Namespaces {
    /// code -> namespace IRI prefix, in assignment order; index is the code.
    codes: Vec<String>,
    #[serde(skip)]
    by_iri: HashMap<String, u32>,
}

impl Namespaces {
    pub fn new() -> Namespaces {
        Namespaces::default()
    }

    /// Rebuild the reverse lookup after deserializing `codes` from a root
    /// payload (the map itself is never serialized, only the Vec is).
    pub fn rehydrate(codes: Vec<String>) -> Namespaces {
        let mut ns = Namespaces {
            codes,
            by_iri: HashMap::new(),
        };
        for (code, iri) in ns.codes.iter().enumerate() {
            ns.by_iri.insert(iri.clone(), code as u32);
        }
        ns
    }

    /// Intern a namespace IRI, assigning a fresh code if it hasn't been seen
    /// before. Codes are never reused or reassigned.
    pub fn intern(&mut self, namespace_iri: &str) -> u32 {
        if let Some(code) = self.by_iri.get(namespace_iri) {
            return *code;
        }
        let code = self.codes.len() as u32;
        self.codes.push(namespace_iri.to_string());
        self.by_iri.insert(namespace_iri.to_string(), code);
        code
    }

    pub fn resolve(&self, code: u32) -> Option<&str> {
        self.codes.get(code as usize).map(|s| s.as_str())
    }

    pub fn lookup(&self, namespace_iri: &str) -> Option<u32> {
        self.by_iri.get(namespace_iri).copied()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

/// Split an IRI at its last `#` or `/` into `(namespace, local-name)` —
/// the inverse of concatenation, and the boundary every [`Sid`] is interned
/// against.
pub fn split_iri(iri: &str) -> (&str, &str) {
    let cut = iri.rfind(|c| c == '#' || c == '/').map(|i| i + 1).unwrap_or(0);
    (&iri[..cut], &iri[cut..])
}

/// Reassemble the full IRI a [`Sid`] stands for, or `None` if its namespace
/// code isn't present in `namespaces` (stale `Sid` from a different ledger).
pub fn to_iri(namespaces: &Namespaces, sid: &Sid) -> Option<String> {
    namespaces.resolve(sid.ns).map(|ns| format!("{}{}", ns, sid.local))
}

#[cfg(test)]
#[path = "sid_test.rs"]
mod sid_test;
