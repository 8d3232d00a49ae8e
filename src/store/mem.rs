//! In-memory ordered byte-store backend.
//!
//! A `BTreeMap<Vec<u8>, Vec<u8>>` behind a single `RwLock`, used as the one
//! concrete implementation of [`super::ByteStore`] shipped with this crate.
//! It is intentionally simple: the interesting engineering in this crate is
//! everything layered *on top* (db, transaction, AOF), not the store itself.

use super::{ByteStore, KeyRange, StoreResult, StoreTx, WriteBatch};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct MemStore {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

pub struct MemWriteBatch {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    ops: Vec<Op>,
}

impl WriteBatch for MemWriteBatch {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(Op::Put(key, value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(Op::Delete(key));
    }

    fn commit(&mut self) -> StoreResult<()> {
        let mut guard = self.data.write().unwrap();
        for op in self.ops.drain(..) {
            match op {
                Op::Put(k, v) => {
                    guard.insert(k, v);
                }
                Op::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.ops.clear();
    }
}

/// Overlay transaction: reads fall through to the base map unless shadowed
/// by a local write; commit applies the overlay atomically under one lock
/// acquisition.
pub struct MemTx {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl StoreTx for MemTx {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(shadowed) = self.overlay.get(key) {
            return Ok(shadowed.clone());
        }
        Ok(self.data.read().unwrap().get(key).cloned())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.overlay.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.overlay.insert(key, None);
    }

    fn range(&self, range: KeyRange) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.data.read().unwrap();
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = guard
            .range((range.start.clone(), range.end.clone()))
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        for (k, v) in self.overlay.range((range.start, range.end)) {
            merged.insert(k.clone(), v.clone());
        }
        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut guard = self.data.write().unwrap();
        for (k, v) in self.overlay {
            match v {
                Some(v) => {
                    guard.insert(k, v);
                }
                None => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

impl ByteStore for MemStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        self.data.write().unwrap().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.data.write().unwrap().remove(key);
        Ok(())
    }

    fn range(&self, range: KeyRange) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.data.read().unwrap();
        Ok(guard
            .range((range.start, range.end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn new_write_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(MemWriteBatch {
            data: Arc::clone(&self.data),
            ops: Vec::new(),
        })
    }

    fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(MemTx {
            data: Arc::clone(&self.data),
            overlay: BTreeMap::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ByteStore;

    #[test]
    fn test_put_get_delete() {
        let store = MemStore::new();
        store.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_write_batch_atomic() {
        let store = MemStore::new();
        let mut batch = store.new_write_batch();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        assert_eq!(store.get(b"a").unwrap(), None);
        batch.commit().unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_tx_read_your_writes_and_isolation() {
        let store = MemStore::new();
        store.put(b"x".to_vec(), b"0".to_vec()).unwrap();

        let mut tx = store.begin().unwrap();
        tx.put(b"x".to_vec(), b"1".to_vec());
        assert_eq!(tx.get(b"x").unwrap(), Some(b"1".to_vec()));
        // Not visible to the base store until commit.
        assert_eq!(store.get(b"x").unwrap(), Some(b"0".to_vec()));

        tx.commit().unwrap();
        assert_eq!(store.get(b"x").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_tx_rollback_discards_writes() {
        let store = MemStore::new();
        let mut tx = store.begin().unwrap();
        tx.put(b"x".to_vec(), b"1".to_vec());
        tx.rollback().unwrap();
        assert_eq!(store.get(b"x").unwrap(), None);
    }

    #[test]
    fn test_range_order() {
        let store = MemStore::new();
        for k in [b"b".to_vec(), b"a".to_vec(), b"c".to_vec()] {
            store.put(k.clone(), k).unwrap();
        }
        let got = store.range(KeyRange::closed(b"a".to_vec(), b"c".to_vec())).unwrap();
        let keys: Vec<_> = got.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }
}
