//! Serializer between in-memory node shapes ([`crate::index::node`]) and
//! their JSON storage payloads.
//!
//! Leaves use a dictionary-encoded v2 form; legacy v1 (no dictionary) must
//! still be readable. Branch/root payloads stringify their boundary flakes
//! rather than nesting them as JSON objects: each descriptor's `first` and
//! `rhs` are serialized flakes (stringified), not nested JSON objects,
//! preserved here since external readers of the format depend on it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::flake::{Flake, IndexOrder, Object};
use crate::index::node::{Bound, Branch, ChildDescriptor, Leaf};
use crate::sid::Sid;
use crate::store::Address;

const LEAF_VERSION_CURRENT: u32 = 2;

/// Sentinel datatype local-name meaning "the object is a subject reference",
/// i.e. `dt = id`.
pub const ID_DATATYPE: &str = "id";

fn sid_json(sid: &Sid) -> serde_json::Value {
    json!([sid.ns, sid.local])
}

fn sid_from_json(v: &serde_json::Value) -> Result<Sid> {
    let arr = v
        .as_array()
        .ok_or_else(|| Error::internal("sid must be a 2-element array"))?;
    let ns = arr
        .get(0)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::internal("sid ns must be a non-negative integer"))? as u32;
    let local = arr
        .get(1)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::internal("sid local must be a string"))?
        .to_string();
    Ok(Sid::new(ns, local))
}

fn object_json(o: &Object) -> serde_json::Value {
    match o {
        Object::Ref(sid) => sid_json(sid),
        Object::Str(s) => json!(s),
        Object::Int(i) => json!(i),
        Object::Float(f) => json!(f),
        Object::Bool(b) => json!(b),
        Object::Time(t) => json!(t.to_rfc3339()),
    }
}

fn object_from_json(v: &serde_json::Value, dt: &Sid) -> Result<Object> {
    if dt.local == ID_DATATYPE {
        return Ok(Object::Ref(sid_from_json(v)?));
    }
    if let Some(b) = v.as_bool() {
        return Ok(Object::Bool(b));
    }
    if let Some(i) = v.as_i64() {
        return Ok(Object::Int(i));
    }
    if let Some(f) = v.as_f64() {
        return Ok(Object::Float(f));
    }
    if let Some(s) = v.as_str() {
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            if dt.local.contains("dateTime") || dt.local.contains("date") {
                return Ok(Object::Time(t.with_timezone(&Utc)));
            }
        }
        return Ok(Object::Str(s.to_string()));
    }
    Err(Error::internal("unrecognized literal encoding"))
}

fn meta_json(m: &crate::flake::Meta) -> serde_json::Value {
    match m {
        Some(map) => json!(map),
        None => serde_json::Value::Null,
    }
}

fn meta_from_json(v: &serde_json::Value) -> crate::flake::Meta {
    if v.is_null() {
        None
    } else {
        serde_json::from_value::<BTreeMap<String, String>>(v.clone()).ok()
    }
}

/// Full (non-dictionary) encoding of one flake: `[s, p, o, dt, t, op, m]`.
pub fn encode_flake_full(f: &Flake) -> serde_json::Value {
    json!([
        sid_json(&f.s),
        sid_json(&f.p),
        object_json(&f.o),
        sid_json(&f.dt),
        f.t,
        f.op,
        meta_json(&f.m),
    ])
}

pub fn decode_flake_full(v: &serde_json::Value) -> Result<Flake> {
    let arr = v
        .as_array()
        .ok_or_else(|| Error::internal("flake must be a 7-element array"))?;
    if arr.len() != 7 {
        return Err(Error::internal("flake array must have exactly 7 slots"));
    }
    let s = sid_from_json(&arr[0])?;
    let p = sid_from_json(&arr[1])?;
    let dt = sid_from_json(&arr[3])?;
    let o = object_from_json(&arr[2], &dt)?;
    let t = arr[4].as_u64().ok_or_else(|| Error::internal("flake t must be u64"))?;
    let op = arr[5].as_bool().ok_or_else(|| Error::internal("flake op must be bool"))?;
    let m = meta_from_json(&arr[6]);
    Ok(Flake::new(s, p, o, dt, t, op, m))
}

/// "Stringified" flake used inside branch/root descriptors.
fn stringify_flake(f: &Flake) -> String {
    encode_flake_full(f).to_string()
}

fn unstringify_flake(s: &str) -> Result<Flake> {
    let v: serde_json::Value = serde_json::from_str(s)?;
    decode_flake_full(&v)
}

// ---------------------------------------------------------------------
// Leaf payload
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct LeafPayloadV2 {
    version: u32,
    dict: Vec<serde_json::Value>,
    // [s_idx, p_idx, o, dt_idx, t, op, m]
    flakes: Vec<(u32, u32, serde_json::Value, u32, u64, bool, serde_json::Value)>,
    rhs: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct LeafPayloadV1 {
    version: u32,
    flakes: Vec<serde_json::Value>,
    rhs: Option<String>,
}

pub fn encode_leaf(leaf: &Leaf) -> Result<Vec<u8>> {
    let mut dict: Vec<Sid> = vec![];
    let mut index_of: BTreeMap<Sid, u32> = BTreeMap::new();
    let mut intern = |sid: &Sid, dict: &mut Vec<Sid>, index_of: &mut BTreeMap<Sid, u32>| -> u32 {
        if let Some(i) = index_of.get(sid) {
            return *i;
        }
        let i = dict.len() as u32;
        dict.push(sid.clone());
        index_of.insert(sid.clone(), i);
        i
    };

    let mut rows = vec![];
    for f in &leaf.flakes {
        let s_idx = intern(&f.s, &mut dict, &mut index_of);
        let p_idx = intern(&f.p, &mut dict, &mut index_of);
        let dt_idx = intern(&f.dt, &mut dict, &mut index_of);
        let o_json = match &f.o {
            Object::Ref(sid) => json!(intern(sid, &mut dict, &mut index_of)),
            other => object_json(other),
        };
        rows.push((s_idx, p_idx, o_json, dt_idx, f.t, f.op, meta_json(&f.m)));
    }

    let payload = LeafPayloadV2 {
        version: LEAF_VERSION_CURRENT,
        dict: dict.iter().map(sid_json).collect(),
        flakes: rows,
        rhs: leaf.bound.rhs.as_ref().map(stringify_flake),
    };
    Ok(serde_json::to_vec(&payload)?)
}

pub fn decode_leaf(bytes: &[u8], order: IndexOrder) -> Result<Leaf> {
    let probe: serde_json::Value = serde_json::from_slice(bytes)?;
    let version = probe.get("version").and_then(|v| v.as_u64()).unwrap_or(1);

    let (flakes, rhs) = if version >= 2 {
        let payload: LeafPayloadV2 = serde_json::from_slice(bytes)?;
        let dict: Vec<Sid> = payload
            .dict
            .iter()
            .map(sid_from_json)
            .collect::<Result<_>>()?;
        let get = |idx: u32| -> Result<Sid> {
            dict.get(idx as usize)
                .cloned()
                .ok_or_else(|| Error::internal("leaf dictionary index out of range"))
        };
        let mut flakes = vec![];
        for (s_idx, p_idx, o_json, dt_idx, t, op, m) in payload.flakes {
            let s = get(s_idx)?;
            let p = get(p_idx)?;
            let dt = get(dt_idx)?;
            let o = if dt.local == ID_DATATYPE {
                let oi = o_json
                    .as_u64()
                    .ok_or_else(|| Error::internal("ref object must be a dict index"))?
                    as u32;
                Object::Ref(get(oi)?)
            } else {
                object_from_json(&o_json, &dt)?
            };
            flakes.push(Flake::new(s, p, o, dt, t, op, meta_from_json(&m)));
        }
        (flakes, payload.rhs)
    } else {
        let payload: LeafPayloadV1 = serde_json::from_slice(bytes)?;
        let flakes = payload
            .flakes
            .iter()
            .map(decode_flake_full)
            .collect::<Result<Vec<_>>>()?;
        (flakes, payload.rhs)
    };

    let first = flakes
        .first()
        .cloned()
        .ok_or_else(|| Error::internal("leaf payload has no flakes"))?;
    let rhs_flake = rhs.map(|s| unstringify_flake(&s)).transpose()?;
    let t = flakes.iter().map(|f| f.t).max().unwrap_or(0);
    Ok(Leaf {
        order,
        flakes,
        bound: Bound {
            first,
            rhs: rhs_flake,
        },
        t,
    })
}

// ---------------------------------------------------------------------
// Branch payload
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct ChildJson {
    address: String,
    #[serde(rename = "leaf?")]
    is_leaf: bool,
    first: String,
    rhs: Option<String>,
    size: usize,
}

#[derive(Serialize, Deserialize)]
struct BranchPayload {
    children: Vec<ChildJson>,
}

pub fn encode_branch(branch: &Branch) -> Result<Vec<u8>> {
    let children = branch
        .children
        .iter()
        .map(|c| ChildJson {
            address: c.address.as_str().to_string(),
            is_leaf: c.is_leaf,
            first: stringify_flake(&c.first),
            rhs: c.rhs.as_ref().map(stringify_flake),
            size: c.size,
        })
        .collect();
    Ok(serde_json::to_vec(&BranchPayload { children })?)
}

pub fn decode_branch(bytes: &[u8], order: IndexOrder) -> Result<Branch> {
    let payload: BranchPayload = serde_json::from_slice(bytes)?;
    let mut children = vec![];
    let mut max_t = 0u64;
    for c in payload.children {
        let first = unstringify_flake(&c.first)?;
        let rhs = c.rhs.map(|s| unstringify_flake(&s)).transpose()?;
        max_t = max_t.max(first.t);
        if let Some(r) = &rhs {
            max_t = max_t.max(r.t);
        }
        children.push(ChildDescriptor {
            address: Address(c.address),
            is_leaf: c.is_leaf,
            first,
            rhs,
            size: c.size,
        });
    }
    Ok(Branch {
        order,
        children,
        t: max_t,
    })
}

// ---------------------------------------------------------------------
// Root payload
// ---------------------------------------------------------------------

/// One per-order root reference, stored as a stringified child descriptor
/// (same shape as a branch child) so loading a root never needs to resolve
/// the node itself just to learn its range.
#[derive(Clone, Serialize, Deserialize)]
pub struct TreeRootRef {
    pub address: Address,
    #[serde(rename = "leaf?")]
    pub is_leaf: bool,
    pub first: String,
    pub rhs: Option<String>,
    pub size: usize,
}

impl TreeRootRef {
    pub fn from_descriptor(desc: &ChildDescriptor) -> Result<TreeRootRef> {
        Ok(TreeRootRef {
            address: desc.address.clone(),
            is_leaf: desc.is_leaf,
            first: stringify_flake(&desc.first),
            rhs: desc.rhs.as_ref().map(stringify_flake),
            size: desc.size,
        })
    }

    pub fn to_descriptor(&self) -> Result<ChildDescriptor> {
        Ok(ChildDescriptor {
            address: self.address.clone(),
            is_leaf: self.is_leaf,
            first: unstringify_flake(&self.first)?,
            rhs: self.rhs.as_ref().map(|s| unstringify_flake(s)).transpose()?,
            size: self.size,
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RootPayload {
    pub t: u64,
    pub trees: BTreeMap<String, TreeRootRef>,
    pub namespace_codes: Vec<String>,
    pub previous_index: Option<Address>,
    pub stats: serde_json::Value,
    pub stats_sketch: Option<Address>,
}

pub fn encode_root(root: &RootPayload) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(root)?)
}

pub fn decode_root(bytes: &[u8]) -> Result<RootPayload> {
    Ok(serde_json::from_slice(bytes)?)
}

// ---------------------------------------------------------------------
// Garbage payload
// ---------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub struct GarbagePayload {
    pub alias: String,
    pub t: u64,
    pub garbage: Vec<Address>,
}

pub fn encode_garbage(g: &GarbagePayload) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(g)?)
}

pub fn decode_garbage(bytes: &[u8]) -> Result<GarbagePayload> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
