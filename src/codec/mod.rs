//! Encoding of the five logical data kinds into backing-store keys/values.
//!
//! spec.md §1 calls this out of scope ("the encoding of each data kind into
//! store keys/values... is an external collaborator"). This module is the
//! thinnest implementation that lets db/batch/expiration have something
//! concrete to batch against; it is deliberately not a full value-encoding
//! scheme (no ziplist-style compact representations, no partial-field
//! updates at the byte level).
//!
//! Key layout: `[kind byte][db_index: u8][user key bytes]`. Each kind gets
//! its own key namespace, so a kv key and a list key with the same user-
//! visible name never collide — mirroring ledisdb's per-type key prefixes.
//! Expiration metadata lives in a parallel namespace ordered by deadline so
//! the expiration cycle (C5) can range-scan it directly:
//! `[EXPIRE_META][kind byte][db_index][deadline: u64 BE][user key bytes]`.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Kv,
    List,
    Hash,
    ZSet,
    Bitmap,
}

impl Kind {
    pub fn all() -> [Kind; 5] {
        [Kind::Kv, Kind::List, Kind::Hash, Kind::ZSet, Kind::Bitmap]
    }

    fn byte(self) -> u8 {
        match self {
            Kind::Kv => b'K',
            Kind::List => b'L',
            Kind::Hash => b'H',
            Kind::ZSet => b'Z',
            Kind::Bitmap => b'B',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Kv => "kv",
            Kind::List => "list",
            Kind::Hash => "hash",
            Kind::ZSet => "zset",
            Kind::Bitmap => "bitmap",
        }
    }
}

const EXPIRE_META: u8 = b'E';
const TTL_META: u8 = b'T';

/// Build the primary-data store key for `kind`/`db_index`/`user_key`.
pub fn data_key(kind: Kind, db_index: u8, user_key: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(2 + user_key.len());
    k.push(kind.byte());
    k.push(db_index);
    k.extend_from_slice(user_key);
    k
}

/// Build the expiration-index key: ordered by deadline within a
/// `(kind, db_index)` namespace so a range scan of the prefix yields
/// expired-first order.
pub fn expire_key(kind: Kind, db_index: u8, deadline_ms: u64, user_key: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(11 + user_key.len());
    k.push(EXPIRE_META);
    k.push(kind.byte());
    k.push(db_index);
    k.extend_from_slice(&deadline_ms.to_be_bytes());
    k.extend_from_slice(user_key);
    k
}

/// Prefix covering every expiration entry for `kind`/`db_index`, in
/// deadline order, usable as a [`crate::store::KeyRange`] lower bound.
pub fn expire_prefix(kind: Kind, db_index: u8) -> Vec<u8> {
    vec![EXPIRE_META, kind.byte(), db_index]
}

/// Decode the user key suffix out of an expire-index key.
pub fn expire_key_user_part(key: &[u8]) -> (u64, &[u8]) {
    let deadline = u64::from_be_bytes(key[3..11].try_into().unwrap());
    (deadline, &key[11..])
}

/// Prefix covering every primary-data key for `kind`/`db_index`.
pub fn data_prefix(kind: Kind, db_index: u8) -> Vec<u8> {
    vec![kind.byte(), db_index]
}

pub fn data_key_user_part(key: &[u8]) -> &[u8] {
    &key[2..]
}

/// Forward TTL pointer: `user key -> current deadline`, maintained
/// alongside the deadline-ordered expire index so `TTL`/`PERSIST`/re-arming
/// an existing expiration can find (and remove) the old expire-index entry
/// in O(1) instead of a reverse scan.
pub fn ttl_key(kind: Kind, db_index: u8, user_key: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(2 + user_key.len());
    k.push(TTL_META);
    k.push(kind.byte());
    k.push(db_index);
    k.extend_from_slice(user_key);
    k
}

pub fn encode_deadline(deadline_ms: u64) -> Vec<u8> {
    deadline_ms.to_be_bytes().to_vec()
}

pub fn decode_deadline(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(bytes.try_into().unwrap())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZSetValue {
    pub members: BTreeMap<Vec<u8>, OrderedFloat<f64>>,
}

impl ZSetValue {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    pub fn sorted(&self) -> Vec<(Vec<u8>, f64)> {
        let mut v: Vec<(Vec<u8>, f64)> = self
            .members
            .iter()
            .map(|(m, s)| (m.clone(), s.into_inner()))
            .collect();
        v.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        v
    }
}

impl Default for ZSetValue {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode_list(list: &std::collections::VecDeque<Vec<u8>>) -> Vec<u8> {
    bincode::serialize(list).expect("list encoding is infallible")
}

pub fn decode_list(bytes: &[u8]) -> anyhow::Result<std::collections::VecDeque<Vec<u8>>> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_hash(hash: &BTreeMap<Vec<u8>, Vec<u8>>) -> Vec<u8> {
    bincode::serialize(hash).expect("hash encoding is infallible")
}

pub fn decode_hash(bytes: &[u8]) -> anyhow::Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn encode_zset(zset: &ZSetValue) -> Vec<u8> {
    bincode::serialize(zset).expect("zset encoding is infallible")
}

pub fn decode_zset(bytes: &[u8]) -> anyhow::Result<ZSetValue> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_key_namespaces_are_disjoint_per_kind() {
        let kv = data_key(Kind::Kv, 0, b"foo");
        let list = data_key(Kind::List, 0, b"foo");
        assert_ne!(kv, list);
    }

    #[test]
    fn test_expire_key_orders_by_deadline() {
        let a = expire_key(Kind::Kv, 0, 100, b"a");
        let b = expire_key(Kind::Kv, 0, 200, b"a");
        assert!(a < b);
    }

    #[test]
    fn test_zset_round_trip() {
        let mut z = ZSetValue::new();
        z.members.insert(b"m1".to_vec(), OrderedFloat(1.5));
        z.members.insert(b"m2".to_vec(), OrderedFloat(0.5));
        let bytes = encode_zset(&z);
        let back = decode_zset(&bytes).unwrap();
        assert_eq!(z, back);
        assert_eq!(back.sorted(), vec![(b"m2".to_vec(), 0.5), (b"m1".to_vec(), 1.5)]);
    }
}
