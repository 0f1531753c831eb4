//! Virtual graph support: expose a foreign table as an RDF-shaped source a
//! query can join against the native ledger, via an R2RML-like mapping.

pub mod exec;
pub mod mapping;

pub use exec::{execute, CellValue, Row, TableSource};
pub use mapping::{ColumnMapping, JoinCondition, MappingRegistry, PredicateMapping, RefMapping, TriplesMap};
