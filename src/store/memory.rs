//! In-memory [`Store`] back-end. Used by tests and embedded callers that
//! don't need durability — the sibling [`crate::store::file::FileStore`]
//! covers the durable case.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Address, Store, WriteReceipt};
use crate::error::{Error, Result};
use crate::util::hash::sha256_base32;

#[derive(Default)]
pub struct MemStore {
    location: String,
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new(location: impl Into<String>) -> MemStore {
        MemStore {
            location: location.into(),
            blobs: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn write(&self, path_prefix: &str, payload: Vec<u8>) -> Result<WriteReceipt> {
        let hash = sha256_base32(&payload);
        let address = Address(format!("fluree:{}:{}/{}.json", self.location, path_prefix, hash));
        let size = payload.len();
        self.blobs.write().insert(address.0.clone(), payload);
        Ok(WriteReceipt { address, hash, size })
    }

    async fn read(&self, address: &Address) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(&address.0)
            .cloned()
            .ok_or_else(|| Error::StorageNotFound {
                address: address.0.clone(),
            })
    }

    async fn delete(&self, address: &Address) -> Result<()> {
        self.blobs.write().remove(&address.0);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Address>> {
        self.list_recursive(prefix).await
    }

    async fn list_recursive(&self, prefix: &str) -> Result<Vec<Address>> {
        let full_prefix = format!("fluree:{}:{}", self.location, prefix);
        Ok(self
            .blobs
            .read()
            .keys()
            .filter(|k| k.starts_with(&full_prefix))
            .map(|k| Address(k.clone()))
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
