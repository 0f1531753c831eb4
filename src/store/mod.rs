//! Content-addressed byte blob storage.
//!
//! A [`Store`] is the sole I/O seam between the index tree / commit log and
//! the bytes backing them. Every read and write is async: resolving a tree
//! node, reading a garbage manifest, or loading a cuckoo filter chain are all
//! suspension points for the query/indexing executors.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::hash::sha256_base32;

/// `fluree:<location-scheme>:<path>/<hash>.json` — opaque to callers, but
/// deterministic for equal content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Build a content-addressed location under `location` / `path_prefix`
    /// from the already-serialized `payload`.
    pub fn content_addressed(location: &str, path_prefix: &str, payload: &[u8]) -> Address {
        let hash = sha256_base32(payload);
        Address(format!("fluree:{}:{}/{}.json", location, path_prefix, hash))
    }

    /// The trailing `<hash>` segment, used by the cuckoo filter chain for
    /// fingerprinting.
    pub fn hash_segment(&self) -> &str {
        self.0
            .rsplit('/')
            .next()
            .and_then(|last| last.strip_suffix(".json"))
            .unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a [`Store::write`] call.
#[derive(Clone, Debug)]
pub struct WriteReceipt {
    pub address: Address,
    pub hash: String,
    pub size: usize,
}

/// An address-keyed byte blob repository.
///
/// Implementations must treat `write` as eventually consistent: a reader
/// racing a writer may observe [`crate::error::Error::StorageNotFound`] for a
/// key that was just written, and should retry subject to the back-end's own
/// consistency semantics — this trait does not itself retry, that's layered
/// on top by callers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Content-address and persist `payload` under `path_prefix`, returning
    /// the resulting address.
    async fn write(&self, path_prefix: &str, payload: Vec<u8>) -> Result<WriteReceipt>;

    /// Idempotent read of a previously written address.
    async fn read(&self, address: &Address) -> Result<Vec<u8>>;

    /// Best-effort delete; a no-op for immutable back-ends.
    async fn delete(&self, address: &Address) -> Result<()>;

    /// Non-recursive listing of keys sharing `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<Address>>;

    /// Recursive listing, used by GC sweeps and branch discovery.
    async fn list_recursive(&self, prefix: &str) -> Result<Vec<Address>>;
}
