//! Connection-independent server commands: `PING`/`ECHO`, `FLUSHALL`,
//! `DBSIZE`, the `INFO`-style keyspace report (SPEC_FULL.md §B), and the
//! replication trio `SLAVEOF`/`FULLSYNC`/`SYNC` grounded on
//! `examples/original_source/server/cmd_replication.go` and `server/info.go`.
//!
//! `SELECT`/`BEGIN`/`COMMIT`/`ROLLBACK`/`QUIT` are not here: each needs the
//! connection's own mutable state (selected DB index, transaction context,
//! socket) rather than just a `LogicalDb`, so the connection layer handles
//! them directly (spec.md §4.6 step 2/4).

use crate::config::DynamicConfig;
use crate::db::DbBank;
use crate::db::LogicalDb;
use crate::persistence::aof::{Aof, Anchor, ReadOutcome};
use crate::persistence::dump;
use crate::protocol::RespValue;
use crate::store::ByteStore;
use std::sync::Arc;
use tokio::sync::RwLock;

pub fn ping(args: &[Vec<u8>]) -> RespValue {
    match args.len() {
        0 => RespValue::SimpleString("PONG".to_string()),
        1 => RespValue::BulkString(Some(args[0].clone())),
        _ => super::wrong_args("ping"),
    }
}

pub fn echo(args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return super::wrong_args("echo");
    }
    RespValue::BulkString(Some(args[0].clone()))
}

/// Purge every DB in the bank. spec.md §6: "rejected in transaction" — the
/// caller is expected to have already checked the connection isn't mid-tx
/// (this is a deny-listed command, see [`crate::transaction`]).
pub async fn flushall(bank: &DbBank) -> RespValue {
    let mut total = 0i64;
    for db in bank.iter() {
        match db.flush_all().await {
            Ok(n) => total += n,
            Err(e) => return RespValue::Error(format!("ERR {}", e)),
        }
    }
    let _ = total;
    RespValue::SimpleString("OK".to_string())
}

pub fn dbsize(db: &Arc<LogicalDb>) -> RespValue {
    RespValue::Integer(db.keyspace.total_entries())
}

/// Keyspace report across every DB in the bank, one line per non-empty DB,
/// formatted the way `server/info.go`'s `Keyspace` section renders —
/// `db<N>:kvs=<k>,kv_expires=<e>,lists=<l>,...`.
pub fn info(bank: &DbBank) -> RespValue {
    let mut out = String::from("# Keyspace\r\n");
    for db in bank.iter() {
        let snap = db.keyspace.snapshot();
        if snap.kvs == 0
            && snap.lists == 0
            && snap.hashes == 0
            && snap.zsets == 0
            && snap.bitmaps == 0
        {
            continue;
        }
        out.push_str(&format!(
            "db{}:kvs={},kv_expires={},lists={},list_expires={},hashes={},hash_expires={},zsets={},zset_expires={},bitmaps={},bitmap_expires={}\r\n",
            db.index,
            snap.kvs, snap.kv_expires,
            snap.lists, snap.list_expires,
            snap.hashes, snap.hash_expires,
            snap.zsets, snap.zset_expires,
            snap.bitmaps, snap.bitmap_expires,
        ));
    }
    RespValue::BulkString(Some(out.into_bytes()))
}

/// Tracks the replication master this node follows, set by `SLAVEOF`.
/// `None` means this node is not replicating (`SLAVEOF NO ONE`), grounded
/// on `cmd_replication.go`'s `app.slaveof`.
#[derive(Default)]
pub struct ReplicationState {
    master: RwLock<Option<(String, u16)>>,
}

impl ReplicationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<(String, u16)> {
        self.master.read().await.clone()
    }
}

pub async fn slaveof(repl: &ReplicationState, args: &[Vec<u8>]) -> RespValue {
    if args.len() == 2 && args[0].eq_ignore_ascii_case(b"no") && args[1].eq_ignore_ascii_case(b"one") {
        *repl.master.write().await = None;
        return RespValue::SimpleString("OK".to_string());
    }
    if args.len() != 2 {
        return super::wrong_args("slaveof");
    }
    let Ok(host) = String::from_utf8(args[0].clone()) else {
        return RespValue::Error("ERR invalid master host".to_string());
    };
    let Some(port) = super::parse_i64(&args[1]).filter(|p| *p > 0 && *p <= u16::MAX as i64) else {
        return RespValue::Error("ERR invalid master port".to_string());
    };
    *repl.master.write().await = Some((host, port as u16));
    RespValue::SimpleString("OK".to_string())
}

/// `FULLSYNC` — dump the whole store and stream it back as one bulk string.
/// Grounded on `cmd_replication.go`'s `fullsyncCommand`, minus the
/// teacher's temp-file indirection: the dump is encoded straight into
/// memory since the store itself is in-memory (spec.md's store is the
/// out-of-scope collaborator; this crate ships only [`crate::store::mem::MemStore`]).
pub async fn fullsync(store: &dyn ByteStore, aof: &Aof, write_lock: &RwLock<()>) -> RespValue {
    let anchor = aof.current_anchor().await;
    match dump::encode(store, anchor, write_lock).await {
        Ok(bytes) => RespValue::BulkString(Some(bytes)),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

/// `SYNC fileIndex fileOffset` — relay up to `max_records` raw AOF records
/// from the given anchor, snappy-compressed with the post-read anchor
/// prefixed, mirroring `cmd_replication.go`'s `syncCommand`.
pub async fn sync(aof: &Aof, args: &[Vec<u8>], max_records: usize) -> RespValue {
    if args.len() != 2 {
        return super::wrong_args("sync");
    }
    let (Some(file_index), Some(file_offset)) = (super::parse_i64(&args[0]), super::parse_i64(&args[1])) else {
        return super::not_an_integer();
    };
    let anchor = Anchor { file_index, file_offset };

    let (records, next) = match aof.copy_n(anchor, max_records).await {
        Ok(ReadOutcome::Records { records, next, .. }) => (records, next),
        Ok(ReadOutcome::Missing) => (Vec::new(), Anchor::MISSING),
        Err(e) => return RespValue::Error(format!("ERR {}", e)),
    };

    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&next.file_index.to_be_bytes());
    buf.extend_from_slice(&next.file_offset.to_be_bytes());
    for record in records {
        buf.extend_from_slice(&record);
    }

    match snap::raw::Encoder::new().compress_vec(&buf) {
        Ok(compressed) => RespValue::BulkString(Some(compressed)),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

/// `CONFIG GET <param>` / `CONFIG SET <param> <value>` against the
/// engine's live-tunable subset (SPEC_FULL.md §A.3), reading/writing the
/// shared [`DynamicConfig`] the same way `SLAVEOF` above reads/writes
/// `ReplicationState` — connection-scoped dispatch, shared state.
pub fn config(dynamic: &DynamicConfig, args: &[Vec<u8>]) -> RespValue {
    let Some(sub) = args.first() else {
        return super::wrong_args("config");
    };
    match sub.to_ascii_uppercase().as_slice() {
        b"GET" => {
            if args.len() != 2 {
                return super::wrong_args("config|get");
            }
            let key = String::from_utf8_lossy(&args[1]).to_string();
            match dynamic.get(&key) {
                Some(value) => RespValue::Array(Some(vec![
                    RespValue::BulkString(Some(key.into_bytes())),
                    RespValue::BulkString(Some(value.into_bytes())),
                ])),
                None => RespValue::Array(Some(Vec::new())),
            }
        }
        b"SET" => {
            if args.len() != 3 {
                return super::wrong_args("config|set");
            }
            let key = String::from_utf8_lossy(&args[1]).to_string();
            let value = String::from_utf8_lossy(&args[2]).to_string();
            match dynamic.set(key, value) {
                Ok(()) => RespValue::SimpleString("OK".to_string()),
                Err(e) => RespValue::Error(format!("ERR {}", e)),
            }
        }
        other => RespValue::Error(format!(
            "ERR unknown CONFIG subcommand '{}'",
            String::from_utf8_lossy(other)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::aof::AofConfig;
    use crate::store::mem::MemStore;

    #[test]
    fn test_ping_with_and_without_message() {
        assert_eq!(ping(&[]), RespValue::SimpleString("PONG".to_string()));
        assert_eq!(ping(&[b"hi".to_vec()]), RespValue::BulkString(Some(b"hi".to_vec())));
    }

    #[tokio::test]
    async fn test_flushall_zeroes_every_db() {
        let store: Arc<dyn ByteStore> = Arc::new(MemStore::new());
        let bank = DbBank::new(2, store);
        bank.get(0)
            .write_value(crate::codec::Kind::Kv, b"k", b"v".to_vec(), true)
            .await
            .unwrap();
        flushall(&bank).await;
        assert_eq!(dbsize(&bank.get(0)), RespValue::Integer(0));
    }

    #[tokio::test]
    async fn test_slaveof_set_then_no_one_clears() {
        let repl = ReplicationState::new();
        slaveof(&repl, &[b"10.0.0.1".to_vec(), b"6380".to_vec()]).await;
        assert_eq!(repl.current().await, Some(("10.0.0.1".to_string(), 6380)));
        slaveof(&repl, &[b"no".to_vec(), b"one".to_vec()]).await;
        assert_eq!(repl.current().await, None);
    }

    #[tokio::test]
    async fn test_sync_with_no_data_returns_missing_anchor_prefixed_payload() {
        let dir = tempfile::tempdir().unwrap();
        let aof = Aof::open(dir.path(), AofConfig::default()).await.unwrap();
        aof.append(0, &[b"SET a 1".to_vec()]).await.unwrap();
        let r = sync(&aof, &[b"1".to_vec(), b"0".to_vec()], 64).await;
        assert!(matches!(r, RespValue::BulkString(Some(_))));
    }

    #[test]
    fn test_config_get_round_trips_a_live_value() {
        let dynamic = DynamicConfig::from_static(&crate::config::StaticConfig::default());
        let reply = config(&dynamic, &[b"GET".to_vec(), b"max_sync_records".to_vec()]);
        assert_eq!(
            reply,
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some(b"max_sync_records".to_vec())),
                RespValue::BulkString(Some(b"64".to_vec())),
            ]))
        );
    }

    #[test]
    fn test_config_set_then_get_observes_the_new_value() {
        let dynamic = DynamicConfig::from_static(&crate::config::StaticConfig::default());
        let set_reply = config(&dynamic, &[b"SET".to_vec(), b"max_sync_records".to_vec(), b"128".to_vec()]);
        assert_eq!(set_reply, RespValue::SimpleString("OK".to_string()));
        assert_eq!(dynamic.get("max_sync_records"), Some("128".to_string()));
    }

    #[test]
    fn test_config_get_unknown_key_returns_empty_array() {
        let dynamic = DynamicConfig::from_static(&crate::config::StaticConfig::default());
        let reply = config(&dynamic, &[b"GET".to_vec(), b"no_such_key".to_vec()]);
        assert_eq!(reply, RespValue::Array(Some(Vec::new())));
    }

    #[test]
    fn test_config_set_rejects_invalid_value() {
        let dynamic = DynamicConfig::from_static(&crate::config::StaticConfig::default());
        let reply = config(&dynamic, &[b"SET".to_vec(), b"max_sync_records".to_vec(), b"-1".to_vec()]);
        assert!(matches!(reply, RespValue::Error(_)));
    }
}
