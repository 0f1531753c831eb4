//! Ties the flake model, index trees, novelty, commits, and branches
//! together into the caller-facing surface: `insert`/`upsert`/`update`,
//! `commit`, `db`, and `history`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::Mutex as AsyncMutex;

use crate::branch::Branch;
use crate::commit::{self, Commit, DataRef};
use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::flake::{Flake, IndexOrder, Object};
use crate::gc::cuckoo::CuckooChain;
use crate::gc::sweep::{self, GcReport};
use crate::index::codec::{self, RootPayload, TreeRootRef};
use crate::index::node::ChildDescriptor;
use crate::index::{build, NodeCache, Tree};
use crate::novelty::Novelty;
use crate::sid::{split_iri, Namespaces, Sid};
use crate::store::{Address, Store};

/// An immutable snapshot of a ledger branch at logical time `t`: the five
/// index roots as of the last refresh, plus novelty accumulated since.
/// Cheap to clone — roots are descriptors, not resolved nodes, and novelty
/// is only ever replaced wholesale, never mutated in place once handed out.
#[derive(Clone)]
pub struct Db {
    pub t: u64,
    pub roots: BTreeMap<&'static str, Option<ChildDescriptor>>,
    pub namespaces: Arc<Namespaces>,
    pub novelty: Arc<Novelty>,
    /// Flakes added since the last commit on this branch, not yet
    /// persisted as a commit's `data` blob — distinct from `novelty`, which
    /// also carries everything earlier commits added but hasn't yet been
    /// folded into the index.
    pending: Arc<Vec<Flake>>,
}

impl Db {
    pub(crate) fn root_for(&self, order: IndexOrder) -> Option<ChildDescriptor> {
        self.roots.get(order.name()).cloned().flatten()
    }
}

/// A literal or reference value supplied by a caller assembling triples;
/// mirrors the `Object` variants but by construction has not yet been
/// interned against a ledger's namespace table.
#[derive(Clone, Debug)]
pub enum Value {
    Ref(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(chrono::DateTime<Utc>),
}

#[derive(Clone, Debug)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Value,
}

/// A staged change: either an assertion or an explicit retraction, used by
/// [`Ledger::update`].
#[derive(Clone, Debug)]
pub enum Change {
    Assert(Triple),
    Retract(Triple),
}

/// One ledger: owns the namespace table and the store; mediates access to
/// one or more branches, each an independent write head.
pub struct Ledger {
    pub alias: String,
    store: Arc<dyn Store>,
    config: LedgerConfig,
    namespaces: RwLock<Namespaces>,
    cache: Arc<NodeCache>,
    branches: RwLock<BTreeMap<String, Arc<BranchState>>>,
}

/// What a refresh produced: the new per-order roots, plus the address of
/// the root manifest that encodes them, for the caller to anchor a commit
/// on.
struct RefreshResult {
    root_address: Address,
    roots: BTreeMap<&'static str, Option<ChildDescriptor>>,
}

struct BranchState {
    branch: Branch,
    /// Serializes refresh attempts for this branch: single-writer per ledger
    /// via a refresh lock. A plain async mutex stands in for a
    /// CAS-marker-plus-promise-channel design: concurrent refreshers simply
    /// queue rather than being handed the in-flight result, a simplification
    /// noted in DESIGN.md.
    refresh_lock: AsyncMutex<()>,
    current: RwLock<Db>,
    /// Segment addresses this branch currently references, for cross-branch
    /// GC. Grown and shrunk in lockstep with `current.roots` on every
    /// refresh.
    cuckoo: RwLock<CuckooChain>,
    /// Garbage produced by this branch's most recent refresh, pending a GC
    /// sweep. Cleared once [`Ledger::gc_sweep`] consumes it.
    pending_garbage: RwLock<Vec<Address>>,
}

impl Ledger {
    pub fn new(alias: impl Into<String>, store: Arc<dyn Store>, config: LedgerConfig) -> Ledger {
        Ledger {
            alias: alias.into(),
            store,
            config,
            namespaces: RwLock::new(Namespaces::new()),
            cache: Arc::new(NodeCache::new()),
            branches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a fresh branch with an empty db at `t = 0`.
    pub fn create_branch(&self, name: impl Into<String>) {
        let name = name.into();
        let empty = Db {
            t: 0,
            roots: IndexOrder::ALL.iter().map(|o| (o.name(), None)).collect(),
            namespaces: Arc::new(Namespaces::new()),
            novelty: Arc::new(Novelty::new()),
            pending: Arc::new(vec![]),
        };
        let state = Arc::new(BranchState {
            branch: Branch::new(name.clone(), None),
            refresh_lock: AsyncMutex::new(()),
            current: RwLock::new(empty),
            cuckoo: RwLock::new(CuckooChain::new(self.config.cuckoo.clone())),
            pending_garbage: RwLock::new(vec![]),
        });
        self.branches.write().unwrap().insert(name, state);
    }

    fn branch_state(&self, name: &str) -> Result<Arc<BranchState>> {
        self.branches
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::validation(format!("no such branch: {}", name)))
    }

    /// `db(ledger, {t})` — a branch's current snapshot when `t` is `None`,
    /// or its state reconstructed as of a historical logical time `t`
    /// otherwise.
    ///
    /// Historical reconstruction walks the commit chain back to the most
    /// recent commit at or before `t` whose `index` anchors a persisted
    /// root (a "refresh-accompanied" commit — see [`Ledger::commit`]), loads
    /// that root, then folds every later commit's data up to and including
    /// `t` back in as novelty — exactly the flakes a refresh at `t` would
    /// have folded in, had one run.
    pub async fn db(&self, branch: &str, t: Option<u64>) -> Result<Db> {
        let state = self.branch_state(branch)?;
        let target_t = match t {
            Some(t) => t,
            None => return Ok(state.current.read().unwrap().clone()),
        };
        let Some(head) = state.branch.head() else {
            return Ok(state.current.read().unwrap().clone());
        };

        let chain = commit::walk_chain(self.store.as_ref(), &head, usize::MAX).await?;
        let anchor = chain.iter().find(|c| c.t <= target_t && c.index.is_some());

        let (roots, anchor_t) = match anchor {
            Some(c) => {
                let address = c.index.clone().expect("checked Some above");
                let bytes = self.store.read(&address).await?;
                let payload = codec::decode_root(&bytes)?;
                let mut roots: BTreeMap<&'static str, Option<ChildDescriptor>> = BTreeMap::new();
                for order in IndexOrder::ALL {
                    let root = match payload.trees.get(order.name()) {
                        Some(r) => Some(r.to_descriptor()?),
                        None => None,
                    };
                    roots.insert(order.name(), root);
                }
                (roots, c.t)
            }
            None => (IndexOrder::ALL.iter().map(|o| (o.name(), None)).collect(), 0),
        };

        let mut novelty = Novelty::new();
        for commit in chain.iter().rev() {
            if commit.t <= anchor_t || commit.t > target_t {
                continue;
            }
            let bytes = self.store.read(&commit.data.address).await?;
            let values: Vec<serde_json::Value> = serde_json::from_slice(&bytes)?;
            for v in &values {
                novelty.add(codec::decode_flake_full(v)?);
            }
        }

        Ok(Db {
            t: target_t,
            roots,
            namespaces: Arc::new((*self.namespaces.read().unwrap()).clone()),
            novelty: Arc::new(novelty),
            pending: Arc::new(vec![]),
        })
    }

    fn intern(&self, iri: &str) -> Sid {
        let (ns, local) = split_iri(iri);
        let code = self.namespaces.write().unwrap().intern(ns);
        Sid::new(code, local)
    }

    fn to_object(&self, value: &Value) -> (Object, Sid) {
        match value {
            Value::Ref(iri) => (Object::Ref(self.intern(iri)), Sid::new(0, "id")),
            Value::Str(s) => (Object::Str(s.clone()), Sid::new(0, "xsd:string")),
            Value::Int(i) => (Object::Int(*i), Sid::new(0, "xsd:integer")),
            Value::Float(f) => (Object::Float(*f), Sid::new(0, "xsd:double")),
            Value::Bool(b) => (Object::Bool(*b), Sid::new(0, "xsd:boolean")),
            Value::Time(t) => (Object::Time(*t), Sid::new(0, "xsd:dateTime")),
        }
    }

    /// Live object(s) currently asserted for `(s, p)`, read through the
    /// `spot` tree plus novelty — used by `upsert`/`update` to compute
    /// implicit retractions.
    async fn live_values(&self, db: &Db, s: &Sid, p: &Sid) -> Result<Vec<Flake>> {
        // A precise `[lo, hi)` range over `(s, p, o, dt, t)` would need an
        // arbitrary placeholder for `o`, whose rank could sort below a real
        // entry's object and wrongly exclude it — simpler and correct to
        // scan unbounded and filter by `(s, p)` afterward.
        let tree = Tree::new(self.store.clone(), IndexOrder::Spot, self.cache.clone(), db.root_for(IndexOrder::Spot));
        let mut out = vec![];
        let mut stream = tree.scan(&db.novelty, db.t, std::ops::Bound::Unbounded, std::ops::Bound::Unbounded);
        while let Some(item) = stream.next().await {
            let f = item?;
            if &f.s == s && &f.p == p {
                out.push(f);
            }
        }
        Ok(out)
    }

    /// Stage assertions with no implicit retraction: `insert`.
    pub async fn insert(&self, db: &Db, triples: &[Triple]) -> Result<Db> {
        let mut novelty = (*db.novelty).clone();
        let mut pending = (*db.pending).clone();
        for triple in triples {
            let s = self.intern(&triple.subject);
            let p = self.intern(&triple.predicate);
            let (o, dt) = self.to_object(&triple.object);
            let flake = Flake::new(s, p, o, dt, db.t + 1, true, None);
            novelty.add(flake.clone());
            pending.push(flake);
        }
        Ok(Db {
            t: db.t + 1,
            roots: db.roots.clone(),
            namespaces: Arc::new((*self.namespaces.read().unwrap()).clone()),
            novelty: Arc::new(novelty),
            pending: Arc::new(pending),
        })
    }

    /// Stage assertions, each implicitly retracting any currently live
    /// value(s) at the same `(s, p)` first — single-valued-predicate upsert.
    pub async fn upsert(&self, db: &Db, triples: &[Triple]) -> Result<Db> {
        let mut novelty = (*db.novelty).clone();
        let mut pending = (*db.pending).clone();
        let next_t = db.t + 1;
        for triple in triples {
            let s = self.intern(&triple.subject);
            let p = self.intern(&triple.predicate);
            for existing in self.live_values(db, &s, &p).await? {
                let retraction = Flake::new(existing.s, existing.p, existing.o, existing.dt, next_t, false, None);
                novelty.add(retraction.clone());
                pending.push(retraction);
            }
            let (o, dt) = self.to_object(&triple.object);
            let assertion = Flake::new(s, p, o, dt, next_t, true, None);
            novelty.add(assertion.clone());
            pending.push(assertion);
        }
        Ok(Db {
            t: next_t,
            roots: db.roots.clone(),
            namespaces: Arc::new((*self.namespaces.read().unwrap()).clone()),
            novelty: Arc::new(novelty),
            pending: Arc::new(pending),
        })
    }

    /// Stage explicit assertions and retractions. Per the flake model's
    /// invariant, a retraction must reference a currently live value;
    /// retracting a value with no live assertion is a consistency error
    /// rather than a silent no-op.
    pub async fn update(&self, db: &Db, changes: &[Change]) -> Result<Db> {
        let mut novelty = (*db.novelty).clone();
        let mut pending = (*db.pending).clone();
        let next_t = db.t + 1;
        for change in changes {
            match change {
                Change::Assert(triple) => {
                    let s = self.intern(&triple.subject);
                    let p = self.intern(&triple.predicate);
                    let (o, dt) = self.to_object(&triple.object);
                    let flake = Flake::new(s, p, o, dt, next_t, true, None);
                    novelty.add(flake.clone());
                    pending.push(flake);
                }
                Change::Retract(triple) => {
                    let s = self.intern(&triple.subject);
                    let p = self.intern(&triple.predicate);
                    let (o, dt) = self.to_object(&triple.object);
                    let live = self.live_values(db, &s, &p).await?;
                    let matches = live.iter().any(|f| f.o == o && f.dt == dt);
                    if !matches {
                        return Err(Error::consistency(format!(
                            "retraction of ({}, {}) has no live assertion to supersede",
                            triple.subject, triple.predicate
                        )));
                    }
                    let flake = Flake::new(s, p, o, dt, next_t, false, None);
                    novelty.add(flake.clone());
                    pending.push(flake);
                }
            }
        }
        Ok(Db {
            t: next_t,
            roots: db.roots.clone(),
            namespaces: Arc::new((*self.namespaces.read().unwrap()).clone()),
            novelty: Arc::new(novelty),
            pending: Arc::new(pending),
        })
    }

    /// Persist a staged db's pending flakes as a commit, advance the branch
    /// head, and refresh the index when accumulated novelty has grown past
    /// the configured threshold. A refresh runs *before* the commit is
    /// written, not after, so the new root manifest's address can be
    /// attached to the commit via [`Commit::with_index`] — that's the only
    /// way a later [`Ledger::db`] time-travel read can find a root to
    /// anchor on without replaying every commit back to branch creation.
    pub async fn commit(&self, branch_name: &str, staged: Db) -> Result<Commit> {
        let state = self.branch_state(branch_name)?;
        let expected_head = state.branch.head();

        let data_bytes = serde_json::to_vec(
            &staged.pending.iter().map(|f| codec::encode_flake_full(f)).collect::<Vec<_>>(),
        )?;
        let receipt = self.store.write("commit/data", data_bytes).await?;

        let mut committed = staged.clone();
        committed.pending = Arc::new(vec![]);

        let index_address = if committed.novelty.total_bytes() >= self.config.index.reindex_min_bytes {
            let outcome = self.refresh(&state, committed.clone()).await?;
            committed.roots = outcome.roots;
            committed.novelty = Arc::new(Novelty::new());
            Some(outcome.root_address)
        } else {
            None
        };

        let mut commit = Commit::new(
            staged.t,
            Utc::now(),
            DataRef {
                address: receipt.address,
                hash: receipt.hash,
            },
            expected_head.clone(),
        );
        if let Some(address) = index_address {
            commit = commit.with_index(address);
        }
        let commit_address = commit::write_commit(self.store.as_ref(), &commit).await?;
        state.branch.advance(expected_head.as_ref(), commit_address)?;

        *state.current.write().unwrap() = committed;

        Ok(commit)
    }

    /// Fold novelty into fresh per-order trees and write a new root manifest,
    /// returning its address so the caller can anchor a commit on it. Runs
    /// under the branch's refresh lock so at most one refresh is in flight
    /// at a time; does not itself touch `state.current` — the caller applies
    /// the returned roots once the commit they accompany has been written.
    async fn refresh(&self, state: &BranchState, db: Db) -> Result<RefreshResult> {
        let _guard = state.refresh_lock.lock().await;
        let mut new_roots: BTreeMap<&'static str, Option<ChildDescriptor>> = BTreeMap::new();
        let mut all_garbage = vec![];
        let mut all_new_addresses = vec![];
        for order in IndexOrder::ALL {
            let existing = Tree::new(self.store.clone(), order, self.cache.clone(), db.root_for(order));
            let outcome = build::refresh_order(self.store.clone(), order, &existing, &db.novelty, &self.config.index, db.t).await?;
            new_roots.insert(order.name(), outcome.root);
            all_garbage.extend(outcome.garbage);
            all_new_addresses.extend(outcome.new_addresses);
        }

        {
            let mut chain = state.cuckoo.write().unwrap();
            chain.insert_all(&all_new_addresses);
            chain.remove_all(&all_garbage);
        }
        self.store
            .write(
                &format!("index/cuckoo/{}", state.branch.name),
                serde_json::to_vec(&state.cuckoo.read().unwrap().to_payload(db.t))?,
            )
            .await?;
        state.pending_garbage.write().unwrap().extend(all_garbage.iter().cloned());

        let mut trees: BTreeMap<String, TreeRootRef> = BTreeMap::new();
        for order in IndexOrder::ALL {
            if let Some(root) = new_roots.get(order.name()).cloned().flatten() {
                trees.insert(order.name().to_string(), TreeRootRef::from_descriptor(&root)?);
            }
        }
        let root_payload = RootPayload {
            t: db.t,
            trees,
            namespace_codes: self.namespaces.read().unwrap().codes().to_vec(),
            previous_index: None,
            stats: serde_json::json!({ "t": db.t }),
            stats_sketch: None,
        };
        let root_bytes = codec::encode_root(&root_payload)?;
        let root_receipt = self.store.write("index/root", root_bytes).await?;

        if !all_garbage.is_empty() {
            let garbage_payload = codec::GarbagePayload {
                alias: self.alias.clone(),
                t: db.t,
                garbage: all_garbage,
            };
            let bytes = codec::encode_garbage(&garbage_payload)?;
            self.store.write("index/garbage", bytes).await?;
        }

        Ok(RefreshResult {
            root_address: root_receipt.address,
            roots: new_roots,
        })
    }

    /// `history(db, subject, t_range)` — raw change history for a subject
    /// (or, if `subject` is `None`, every subject) within `t_range`: unlike
    /// every other read path, this does *not* fold novelty down to "live at
    /// t"; it returns every assertion and retraction, in `t` order.
    pub async fn history(&self, db: &Db, subject: Option<&Sid>, t_range: std::ops::Range<u64>) -> Result<Vec<Flake>> {
        let tree = Tree::new(self.store.clone(), IndexOrder::Tspo, self.cache.clone(), db.root_for(IndexOrder::Tspo));

        let mut persisted = tree.scan_all_raw().await?;
        persisted.retain(|f| t_range.contains(&f.t));
        let mut novelty: Vec<Flake> = db
            .novelty
            .iter_order(IndexOrder::Tspo)
            .filter(|f| t_range.contains(&f.t))
            .cloned()
            .collect();
        persisted.append(&mut novelty);

        if let Some(s) = subject {
            persisted.retain(|f| &f.s == s);
        }
        persisted.sort_by(|a, b| IndexOrder::Tspo.compare(a, b));
        Ok(persisted)
    }

    /// Sweep `branch_name`'s pending garbage: delete any segment absent from
    /// every *other* branch's cuckoo filter chain, and drop the garbage
    /// manifest for what was reclaimed. A false-positive membership test
    /// just retains a segment another round would have reclaimed — safe,
    /// only wasteful.
    pub async fn gc_sweep(&self, branch_name: &str) -> Result<GcReport> {
        let state = self.branch_state(branch_name)?;
        let candidates = std::mem::take(&mut *state.pending_garbage.write().unwrap());
        if candidates.is_empty() {
            return Ok(GcReport::default());
        }

        let others: Vec<Arc<RwLock<CuckooChain>>> = self
            .branches
            .read()
            .unwrap()
            .iter()
            .filter(|(name, _)| name.as_str() != branch_name)
            .map(|(_, s)| {
                // `cuckoo` lives behind a plain `RwLock`, not an `Arc`; clone
                // the chain itself so the sweep can run without holding every
                // other branch's lock at once.
                Arc::new(RwLock::new(s.cuckoo.read().unwrap().clone()))
            })
            .collect();

        let report = sweep::sweep(self.store.as_ref(), candidates, &others).await?;
        state.pending_garbage.write().unwrap().extend(report.retained.iter().cloned());
        Ok(report)
    }

    pub(crate) fn store_handle(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub(crate) fn cache_handle(&self) -> Arc<NodeCache> {
        self.cache.clone()
    }

    pub(crate) fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run a query's pattern group against `db`'s native index and apply its
    /// solution modifiers, returning the final rows.
    pub async fn query(&self, db: &Db, query: &crate::query::ast::Query) -> Result<crate::query::exec::Solution> {
        crate::query::exec::execute(self.store_handle(), self.cache_handle(), db, query, &self.config).await
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod ledger_test;
