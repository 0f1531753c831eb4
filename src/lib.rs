//! A content-addressed, immutable graph database: flakes over a
//! sorted-index store, novelty buffering, cuckoo-filter garbage collection,
//! and a SPARQL-like query engine over both the native index and mapped
//! virtual graphs.

pub mod branch;
pub mod commit;
pub mod config;
pub mod error;
pub mod flake;
pub mod gc;
pub mod index;
pub mod ledger;
pub mod novelty;
pub mod query;
pub mod sid;
pub mod store;
pub mod util;
pub mod vg;

pub use error::{Error, ErrorKind, Result};
pub use flake::Flake;
pub use ledger::{Db, Ledger};
pub use sid::Sid;
