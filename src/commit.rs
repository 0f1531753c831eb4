//! Commit records: the envelope persisted for each transaction, chained
//! back through `prev_commit` and content-addressed like everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{Address, Store};

/// Pointer to the serialized flake set a commit added, plus its hash for
/// integrity checking on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataRef {
    pub address: Address,
    pub hash: String,
}

/// One transaction: `t`, timestamp, the flakes it added (by reference),
/// an optional pointer to the index root a refresh produced alongside it,
/// and the chain back to the previous commit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Commit {
    pub t: u64,
    pub time: DateTime<Utc>,
    pub data: DataRef,
    pub prev_commit: Option<Address>,
    pub index: Option<Address>,
    pub signature: Option<String>,
}

impl Commit {
    pub fn new(t: u64, time: DateTime<Utc>, data: DataRef, prev_commit: Option<Address>) -> Commit {
        Commit {
            t,
            time,
            data,
            prev_commit,
            index: None,
            signature: None,
        }
    }

    pub fn with_index(mut self, index: Address) -> Commit {
        self.index = Some(index);
        self
    }

    pub fn with_signature(mut self, signature: String) -> Commit {
        self.signature = Some(signature);
        self
    }
}

pub async fn write_commit(store: &dyn Store, commit: &Commit) -> Result<Address> {
    let bytes = serde_json::to_vec(commit)?;
    let receipt = store.write("commit", bytes).await?;
    Ok(receipt.address)
}

pub async fn read_commit(store: &dyn Store, address: &Address) -> Result<Commit> {
    let bytes = store.read(address).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Walk a commit chain back from `head`, most recent first, stopping once
/// `limit` commits have been collected or the chain's start is reached.
pub async fn walk_chain(store: &dyn Store, head: &Address, limit: usize) -> Result<Vec<Commit>> {
    let mut out = vec![];
    let mut cursor = Some(head.clone());
    while let Some(addr) = cursor {
        if out.len() >= limit {
            break;
        }
        let commit = read_commit(store, &addr).await?;
        cursor = commit.prev_commit.clone();
        out.push(commit);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "commit_test.rs"]
mod commit_test;
