//! Filesystem-backed [`Store`]. Follows the `disk.rs` / `file_lock.rs`
//! pattern of resolving a logical name to an on-disk path and doing plain
//! `std::fs` I/O — wrapped here in `spawn_blocking` since the trait itself
//! is async.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{Address, Store, WriteReceipt};
use crate::error::{Error, Result};
use crate::util::hash::sha256_base32;
use crate::util::write_file_atomic;

pub struct FileStore {
    root: PathBuf,
    location: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, location: impl Into<String>) -> FileStore {
        FileStore {
            root: root.into(),
            location: location.into(),
        }
    }

    fn address_to_path(&self, address: &Address) -> PathBuf {
        let rel = address
            .0
            .strip_prefix(&format!("fluree:{}:", self.location))
            .unwrap_or(&address.0);
        self.root.join(rel)
    }

    fn prefix_dir(&self, prefix: &str) -> PathBuf {
        self.root.join(prefix)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn write(&self, path_prefix: &str, payload: Vec<u8>) -> Result<WriteReceipt> {
        let hash = sha256_base32(&payload);
        let address = Address(format!("fluree:{}:{}/{}.json", self.location, path_prefix, hash));
        let path = self.address_to_path(&address);
        let size = payload.len();
        tokio::task::spawn_blocking(move || write_file_atomic(&path, &payload))
            .await
            .map_err(|e| Error::internal(format!("write join error: {}", e)))??;
        Ok(WriteReceipt { address, hash, size })
    }

    async fn read(&self, address: &Address) -> Result<Vec<u8>> {
        let path = self.address_to_path(address);
        let addr = address.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::read(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::StorageNotFound {
                    address: addr.0.clone(),
                },
                _ => Error::StorageTransient {
                    message: e.to_string(),
                },
            })
        })
        .await
        .map_err(|e| Error::internal(format!("read join error: {}", e)))?
    }

    async fn delete(&self, address: &Address) -> Result<()> {
        let path = self.address_to_path(address);
        tokio::task::spawn_blocking(move || std::fs::remove_file(path).ok())
            .await
            .map_err(|e| Error::internal(format!("delete join error: {}", e)))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Address>> {
        self.list_recursive(prefix).await
    }

    async fn list_recursive(&self, prefix: &str) -> Result<Vec<Address>> {
        let dir = self.prefix_dir(prefix);
        let location = self.location.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut out = vec![];
            visit(&dir, &mut |path| {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    out.push(Address(format!("fluree:{}:{}/{}", location, prefix, name)));
                }
            });
            out
        })
        .await
        .map_err(|e| Error::internal(format!("list join error: {}", e)))
    }
}

fn visit(dir: &std::path::Path, visitor: &mut impl FnMut(&std::path::Path)) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            visit(&path, visitor);
        } else {
            visitor(&path);
        }
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
