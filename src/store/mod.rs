//! The pluggable ordered byte-store.
//!
//! This is the external collaborator described in spec.md §1/§6: an ordered
//! mapping from byte-key to byte-value with point reads/writes, range
//! iteration, write-batches and store-level transactions. The engine itself
//! (db, transaction, persistence) only ever talks to this trait; it never
//! assumes a particular backend.
//!
//! [`mem::MemStore`] is the one concrete backend shipped with this crate —
//! a `BTreeMap` guarded by a single `RwLock`. Swapping in an LSM-tree or
//! B-tree-on-disk engine means implementing [`ByteStore`] and nothing else
//! in this crate needs to change.

pub mod mem;

use std::ops::Bound;

pub type StoreResult<T> = anyhow::Result<T>;

/// Inclusive/exclusive/open range bounds for [`ByteStore::range`].
#[derive(Debug, Clone)]
pub struct KeyRange {
    pub start: Bound<Vec<u8>>,
    pub end: Bound<Vec<u8>>,
}

impl KeyRange {
    pub fn closed(min: Vec<u8>, max: Vec<u8>) -> Self {
        Self {
            start: Bound::Included(min),
            end: Bound::Included(max),
        }
    }

    pub fn right_open(min: Vec<u8>, max: Vec<u8>) -> Self {
        Self {
            start: Bound::Included(min),
            end: Bound::Excluded(max),
        }
    }

    pub fn prefix(prefix: Vec<u8>) -> Self {
        let mut upper = prefix.clone();
        if let Some(last) = upper.last_mut() {
            if *last < 0xff {
                *last += 1;
                upper.truncate(upper.len());
                return Self {
                    start: Bound::Included(prefix),
                    end: Bound::Excluded(upper),
                };
            }
        }
        Self {
            start: Bound::Included(prefix),
            end: Bound::Unbounded,
        }
    }
}

/// A batch of writes committed atomically against the backing store.
pub trait WriteBatch: Send {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, key: Vec<u8>);
    /// Commit the staged writes. Consumes the batch's staged ops but the
    /// type itself can be reused for another round after commit.
    fn commit(&mut self) -> StoreResult<()>;
    /// Discard staged, uncommitted writes without touching the store.
    fn rollback(&mut self);
}

/// An isolated, committable view over the store obtained from
/// [`ByteStore::begin`]. Reads observe prior writes made within the same
/// transaction ("read-your-writes") but not concurrent writers.
pub trait StoreTx: Send {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, key: Vec<u8>);
    fn range(&self, range: KeyRange) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
    fn commit(self: Box<Self>) -> StoreResult<()>;
    fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// The ordered byte-store contract every logical DB is layered on top of.
pub trait ByteStore: Send + Sync {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()>;
    fn delete(&self, key: &[u8]) -> StoreResult<()>;
    /// Sorted iteration over `range`, returned eagerly (the concrete
    /// backend is in-memory; a disk-backed implementation would stream).
    fn range(&self, range: KeyRange) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
    fn new_write_batch(&self) -> Box<dyn WriteBatch>;
    fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}
