//! Keyspace counters and the `info.json` sidecar (spec.md C8).
//!
//! Ten monotonic per-DB counters (five kinds, five `*Expires` companions),
//! mutated on every successful primary-record insert/delete — including
//! expiration deletes, which flow through the same per-kind batch as user
//! deletes (spec.md §3 invariant: "Expiration deletes pass through the
//! same per-kind batch... so counters remain consistent").
//!
//! Grounded on `examples/original_source/ledis/keyspace.go`: the Go struct
//! of eponymous plain ints is reimplemented as atomics since counters here
//! are updated from many connection tasks concurrently without a lock
//! (spec.md §5: "Keyspace counters: per-DB atomics; no locks needed").

use crate::codec::Kind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct Keyspace {
    pub kvs: AtomicI64,
    pub kv_expires: AtomicI64,
    pub lists: AtomicI64,
    pub list_expires: AtomicI64,
    pub bitmaps: AtomicI64,
    pub bitmap_expires: AtomicI64,
    pub zsets: AtomicI64,
    pub zset_expires: AtomicI64,
    pub hashes: AtomicI64,
    pub hash_expires: AtomicI64,
}

impl Keyspace {
    pub fn add(&self, kind: Kind, delta: i64) {
        let counter = match kind {
            Kind::Kv => &self.kvs,
            Kind::List => &self.lists,
            Kind::Bitmap => &self.bitmaps,
            Kind::ZSet => &self.zsets,
            Kind::Hash => &self.hashes,
        };
        counter.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn add_expires(&self, kind: Kind, delta: i64) {
        let counter = match kind {
            Kind::Kv => &self.kv_expires,
            Kind::List => &self.list_expires,
            Kind::Bitmap => &self.bitmap_expires,
            Kind::ZSet => &self.zset_expires,
            Kind::Hash => &self.hash_expires,
        };
        counter.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> KeyspaceSnapshot {
        KeyspaceSnapshot {
            kvs: self.kvs.load(Ordering::Relaxed),
            kv_expires: self.kv_expires.load(Ordering::Relaxed),
            lists: self.lists.load(Ordering::Relaxed),
            list_expires: self.list_expires.load(Ordering::Relaxed),
            bitmaps: self.bitmaps.load(Ordering::Relaxed),
            bitmap_expires: self.bitmap_expires.load(Ordering::Relaxed),
            zsets: self.zsets.load(Ordering::Relaxed),
            zset_expires: self.zset_expires.load(Ordering::Relaxed),
            hashes: self.hashes.load(Ordering::Relaxed),
            hash_expires: self.hash_expires.load(Ordering::Relaxed),
        }
    }

    /// Count of live primary-kind entries, used by `DBSIZE` without a scan.
    pub fn total_entries(&self) -> i64 {
        self.kvs.load(Ordering::Relaxed)
            + self.lists.load(Ordering::Relaxed)
            + self.bitmaps.load(Ordering::Relaxed)
            + self.zsets.load(Ordering::Relaxed)
            + self.hashes.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KeyspaceSnapshot {
    pub kvs: i64,
    pub kv_expires: i64,
    pub lists: i64,
    pub list_expires: i64,
    pub bitmaps: i64,
    pub bitmap_expires: i64,
    pub zsets: i64,
    pub zset_expires: i64,
    pub hashes: i64,
    pub hash_expires: i64,
}

/// Serializes the aggregate keyspace array to `info.json`, guarded by a
/// mutex during writes per spec.md §5 ("Info struct: guarded by a mutex
/// during `collectSysInfo` writes").
pub struct InfoSidecar {
    path: std::path::PathBuf,
    write_lock: Mutex<()>,
}

impl InfoSidecar {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join("info.json"),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn flush(&self, snapshots: &[KeyspaceSnapshot]) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_vec_pretty(snapshots)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Spawns the periodic `info.json` flush task (SPEC_FULL.md §B: "in
/// addition to the shutdown-time write, `info.json` is rewritten every
/// `keyspace_flush` interval").
pub fn spawn_periodic_flush(
    sidecar: std::sync::Arc<InfoSidecar>,
    keyspaces: std::sync::Arc<Vec<std::sync::Arc<Keyspace>>>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let snapshots: Vec<KeyspaceSnapshot> = keyspaces.iter().map(|k| k.snapshot()).collect();
            match sidecar.flush(&snapshots).await {
                Ok(()) => info!("keyspace sidecar flushed"),
                Err(e) => error!("keyspace sidecar flush failed: {}", e),
            }
        }
    })
}
