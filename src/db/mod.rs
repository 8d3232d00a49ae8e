//! Logical DB bank (spec.md C3, §4.3).
//!
//! A `LogicalDb` wraps the shared backing store with a per-DB read/write
//! lock and five typed batches, one per data kind. `DbBank` is the
//! fixed-size array of `N_DB` logical DBs that all share one
//! [`ByteStore`]. Grounded on
//! `examples/original_source/ledis/ledis_db.go` (`newDB`, `FlushAll`,
//! `flushRegion`'s 1024-entry commit chunking).

pub mod batch;

use crate::codec::{self, Kind};
use crate::keyspace::Keyspace;
use crate::store::{ByteStore, KeyRange, StoreTx};
use batch::{Batch, Locker, TxWriteBatch};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::RwLock;

/// Number of keys deleted per batch commit during a bulk flush/flush-region,
/// matching the Go source's `drop&1023 == 0` chunking.
const FLUSH_CHUNK: i64 = 1024;

/// Where a `LogicalDb` reads key ranges from: the shared backing store in
/// regular mode, or a store transaction's overlay-merged view while a
/// transaction is in progress (spec.md §4.4: "clone the DB into a
/// transactional shell where `bucket = storeTx`").
enum Source {
    Store(Arc<dyn ByteStore>),
    Tx(Arc<StdMutex<Box<dyn StoreTx>>>),
}

impl Source {
    fn range(&self, range: KeyRange) -> anyhow::Result<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            Source::Store(s) => s.range(range),
            Source::Tx(tx) => tx.lock().unwrap().range(range),
        }
    }

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        match self {
            Source::Store(s) => s.get(key),
            Source::Tx(tx) => tx.lock().unwrap().get(key),
        }
    }
}

pub struct LogicalDb {
    pub index: u8,
    source: Source,
    db_lock: Arc<RwLock<()>>,
    pub kv_batch: Batch,
    pub list_batch: Batch,
    pub hash_batch: Batch,
    pub zset_batch: Batch,
    pub bitmap_batch: Batch,
    pub keyspace: Arc<Keyspace>,
    pub is_tx: bool,
}

impl LogicalDb {
    fn new(index: u8, store: Arc<dyn ByteStore>) -> Self {
        let db_lock = Arc::new(RwLock::new(()));
        let locker = || Locker::Regular {
            db_lock: Arc::clone(&db_lock),
        };
        Self {
            index,
            kv_batch: Batch::new(store.new_write_batch(), locker()),
            list_batch: Batch::new(store.new_write_batch(), locker()),
            hash_batch: Batch::new(store.new_write_batch(), locker()),
            zset_batch: Batch::new(store.new_write_batch(), locker()),
            bitmap_batch: Batch::new(store.new_write_batch(), locker()),
            keyspace: Arc::new(Keyspace::default()),
            source: Source::Store(store),
            db_lock,
            is_tx: false,
        }
    }

    /// Build the transactional shell described in spec.md §4.4 step 3: same
    /// index and the *same* keyspace counters (so expiration/deletes inside
    /// the transaction keep the counters consistent with the outer DB), but
    /// every batch routes through `store_tx` and `is_tx` is set.
    pub(crate) fn new_tx_shell(
        index: u8,
        keyspace: Arc<Keyspace>,
        store_tx: Arc<StdMutex<Box<dyn StoreTx>>>,
    ) -> Self {
        let shared_batch = || Batch::new(Box::new(TxWriteBatch { tx: Arc::clone(&store_tx) }), Locker::Tx);
        Self {
            index,
            kv_batch: shared_batch(),
            list_batch: shared_batch(),
            hash_batch: shared_batch(),
            zset_batch: shared_batch(),
            bitmap_batch: shared_batch(),
            keyspace,
            source: Source::Tx(store_tx),
            db_lock: Arc::new(RwLock::new(())),
            is_tx: true,
        }
    }

    /// Acquire the DB's exclusive write-lock for a transaction. Held for
    /// the lifetime of the transaction; blocks every other writer and, via
    /// the batches' read-lock, every other reader too (spec.md §4.4 step 1).
    pub fn write_lock(&self) -> Arc<RwLock<()>> {
        Arc::clone(&self.db_lock)
    }

    /// Sorted range read over this DB's view of the backing store (the
    /// shared store in regular mode, or the store transaction's overlay-
    /// merged view mid-transaction). Used by command handlers for scans
    /// (list/hash/zset reads) and by the expiration cycle (C5).
    pub fn range(&self, range: KeyRange) -> anyhow::Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.source.range(range)
    }

    /// Point read over this DB's view of the backing store.
    pub fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        self.source.get(key)
    }

    /// Open a store-level transaction against this DB's backing store.
    /// Only valid on a regular (non-shell) DB; `is_tx` is checked by the
    /// caller (`TransactionContext::begin`) before this is ever invoked on
    /// a transactional shell.
    pub(crate) fn source_begin(&self) -> anyhow::Result<Box<dyn StoreTx>> {
        match &self.source {
            Source::Store(s) => s.begin(),
            Source::Tx(_) => anyhow::bail!("cannot begin a transaction within a transaction"),
        }
    }

    pub fn batch(&self, kind: Kind) -> &Batch {
        match kind {
            Kind::Kv => &self.kv_batch,
            Kind::List => &self.list_batch,
            Kind::Hash => &self.hash_batch,
            Kind::ZSet => &self.zset_batch,
            Kind::Bitmap => &self.bitmap_batch,
        }
    }

    /// Delete every primary-data and expire-index key belonging to this DB
    /// for one kind, in `FLUSH_CHUNK`-sized committed batches. Returns the
    /// number of primary entries dropped (expire-index entries are not
    /// counted, mirroring the Go source's `flushRegion` which only counts
    /// the region it was called against).
    async fn flush_kind(&self, kind: Kind) -> anyhow::Result<i64> {
        let data_range = KeyRange::prefix(codec::data_prefix(kind, self.index));
        let expire_range = KeyRange::prefix(codec::expire_prefix(kind, self.index));

        let mut dropped = 0i64;
        {
            let keys: Vec<Vec<u8>> = self
                .source
                .range(data_range)?
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            let mut handle = self.batch(kind).acquire().await;
            for key in keys {
                handle.delete(key);
                dropped += 1;
                if dropped % FLUSH_CHUNK == 0 {
                    handle.commit()?;
                }
            }
            handle.commit()?;
        }
        {
            let keys: Vec<Vec<u8>> = self
                .source
                .range(expire_range)?
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            if !keys.is_empty() {
                let mut handle = self.batch(kind).acquire().await;
                for (i, key) in keys.into_iter().enumerate() {
                    handle.delete(key);
                    if (i as i64 + 1) % FLUSH_CHUNK == 0 {
                        handle.commit()?;
                    }
                }
                handle.commit()?;
            }
        }

        self.keyspace.add(kind, -dropped);
        Ok(dropped)
    }

    /// Drop every key in every kind belonging to this DB. Returns the total
    /// entries dropped across all five kinds (spec.md §4.3: "the returned
    /// drop count is the sum of all kinds").
    pub async fn flush_all(&self) -> anyhow::Result<i64> {
        let mut drop = 0i64;
        for kind in Kind::all() {
            drop += self.flush_kind(kind).await?;
        }
        Ok(drop)
    }
}

/// A fixed-size bank of `N_DB` logical databases sharing one backing store.
pub struct DbBank {
    dbs: Vec<Arc<LogicalDb>>,
}

impl DbBank {
    pub fn new(n_db: u8, store: Arc<dyn ByteStore>) -> Self {
        let dbs = (0..n_db)
            .map(|i| Arc::new(LogicalDb::new(i, Arc::clone(&store))))
            .collect();
        Self { dbs }
    }

    pub fn get(&self, index: u8) -> Arc<LogicalDb> {
        Arc::clone(&self.dbs[index as usize])
    }

    pub fn len(&self) -> usize {
        self.dbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dbs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LogicalDb>> {
        self.dbs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn test_flush_all_drops_every_kind_and_zeroes_keyspace() {
        let store: Arc<dyn ByteStore> = Arc::new(MemStore::new());
        let bank = DbBank::new(4, store);
        let db = bank.get(0);

        {
            let mut h = db.kv_batch.acquire().await;
            h.put(codec::data_key(Kind::Kv, 0, b"a"), b"1".to_vec());
            h.put(codec::data_key(Kind::Kv, 0, b"b"), b"2".to_vec());
            h.commit().unwrap();
        }
        db.keyspace.add(Kind::Kv, 2);

        let dropped = db.flush_all().await.unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(db.keyspace.snapshot().kvs, 0);
    }

    #[tokio::test]
    async fn test_bank_indices_are_independent() {
        let store: Arc<dyn ByteStore> = Arc::new(MemStore::new());
        let bank = DbBank::new(2, store);
        let db0 = bank.get(0);
        let db1 = bank.get(1);
        assert_eq!(db0.index, 0);
        assert_eq!(db1.index, 1);
        assert_eq!(bank.len(), 2);
    }
}
