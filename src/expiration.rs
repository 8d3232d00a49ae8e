//! Expiration cycle (spec.md C5, §4.5).
//!
//! A single background task ticks once a second. Each tick runs every
//! logical DB's eliminator sequentially inside one spawned task and waits
//! for it to finish before scheduling the next tick — so a slow cycle never
//! overlaps itself (the one-second cadence is between completions, not
//! between starts). Grounded on
//! `examples/original_source/ledis/ledis_db.go`'s `newEliminator`, which
//! registers one deletion callback + matching batch per kind, and on the
//! per-second cadence described in spec.md §4.5.

use crate::codec::{self, Kind};
use crate::db::DbBank;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const TICK: Duration = Duration::from_secs(1);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Scan one DB's expiration index for one kind and delete everything whose
/// deadline has passed, through that kind's batch so the primary and
/// `*Expires` keyspace counters stay consistent with the underlying store
/// writes (spec.md §4.5: "decrements both the `*Expires` and primary
/// counter atomically with the underlying store writes").
async fn eliminate_kind(db: &crate::db::LogicalDb, kind: Kind, now: u64) -> anyhow::Result<u64> {
    let prefix = codec::expire_prefix(kind, db.index);
    // Exclusive upper bound at `now + 1` so entries with deadline == now
    // (which sort before any same-deadline key with a non-empty user-key
    // suffix) are still included.
    let upper = codec::expire_key(kind, db.index, now.saturating_add(1), &[]);
    let range = crate::store::KeyRange::right_open(prefix, upper);

    let expired: Vec<(u64, Vec<u8>, Vec<u8>)> = db
        .range(range)?
        .into_iter()
        .map(|(k, _)| {
            let (deadline, user_key) = codec::expire_key_user_part(&k);
            (deadline, user_key.to_vec(), k)
        })
        .collect();

    if expired.is_empty() {
        return Ok(0);
    }

    let mut n = 0u64;
    let mut handle = db.batch(kind).acquire().await;
    for (_, user_key, expire_key) in &expired {
        handle.delete(codec::data_key(kind, db.index, user_key));
        handle.delete(expire_key.clone());
        n += 1;
    }
    handle.commit()?;
    db.keyspace.add(kind, -(n as i64));
    db.keyspace.add_expires(kind, -(n as i64));
    Ok(n)
}

async fn eliminate_db(db: &crate::db::LogicalDb, now: u64) {
    for kind in Kind::all() {
        match eliminate_kind(db, kind, now).await {
            Ok(0) => {}
            Ok(n) => debug!(db = db.index, kind = kind.name(), count = n, "expired keys"),
            Err(e) => warn!(db = db.index, kind = kind.name(), error = %e, "expiration pass failed"),
        }
    }
}

/// Spawn the background expiration task. Returns its `JoinHandle` so the
/// caller can abort it on shutdown.
pub fn spawn(bank: Arc<DbBank>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let bank = Arc::clone(&bank);
            // One task runs every DB's eliminator back-to-back; the sleep
            // below only starts once that task finishes, so a long cycle
            // never overlaps the next tick.
            let cycle = tokio::spawn(async move {
                let now = now_ms();
                for db in bank.iter() {
                    eliminate_db(db, now).await;
                }
            });
            let _ = cycle.await;
            tokio::time::sleep(TICK).await;
        }
    })
}
