//! Expiration commands, generic over [`Kind`] and built on
//! [`crate::db::value_ops`]'s `set_expire`/`ttl_deadline`/`persist`.
//!
//! spec.md §6 names these bare (`EXPIRE`/`TTL`/`PERSIST`) for the Kv kind
//! and kind-prefixed (`BEXPIRE`/`BTTL`/`BPERSIST`, "and analogous commands
//! for other kinds") elsewhere; each prefixed name below is a thin
//! wrapper that pins the `Kind` and forwards to the shared generic body.

use super::not_an_integer;
use crate::codec::Kind;
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

async fn expire_generic(db: &Arc<LogicalDb>, kind: Kind, cmd: &str, args: &[Vec<u8>], in_ms: bool) -> RespValue {
    if args.len() != 2 {
        return super::wrong_args(cmd);
    }
    let Some(n) = super::parse_i64(&args[1]) else {
        return not_an_integer();
    };
    let deadline = if in_ms { now_ms() as i64 + n } else { now_ms() as i64 + n * 1000 };
    if deadline < 0 {
        return match db.delete_key(kind, &args[0]).await {
            Ok(existed) => RespValue::Integer(existed as i64),
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        };
    }
    match db.set_expire(kind, &args[0], deadline as u64).await {
        Ok(armed) => RespValue::Integer(armed as i64),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

async fn expireat_generic(db: &Arc<LogicalDb>, kind: Kind, cmd: &str, args: &[Vec<u8>], in_ms: bool) -> RespValue {
    if args.len() != 2 {
        return super::wrong_args(cmd);
    }
    let Some(n) = super::parse_i64(&args[1]) else {
        return not_an_integer();
    };
    let deadline = if in_ms { n } else { n * 1000 };
    if deadline <= now_ms() as i64 {
        return match db.delete_key(kind, &args[0]).await {
            Ok(existed) => RespValue::Integer(existed as i64),
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        };
    }
    match db.set_expire(kind, &args[0], deadline as u64).await {
        Ok(armed) => RespValue::Integer(armed as i64),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

async fn ttl_generic(db: &Arc<LogicalDb>, kind: Kind, cmd: &str, args: &[Vec<u8>], in_ms: bool) -> RespValue {
    if args.len() != 1 {
        return super::wrong_args(cmd);
    }
    match db.ttl_deadline(kind, &args[0]) {
        Ok(Some(deadline)) => {
            let remaining = deadline as i64 - now_ms() as i64;
            let remaining = remaining.max(0);
            RespValue::Integer(if in_ms { remaining } else { remaining / 1000 })
        }
        Ok(None) => RespValue::Integer(-1),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

async fn persist_generic(db: &Arc<LogicalDb>, kind: Kind, cmd: &str, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return super::wrong_args(cmd);
    }
    match db.persist(kind, &args[0]).await {
        Ok(cleared) => RespValue::Integer(cleared as i64),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

macro_rules! kind_expiry_commands {
    ($kind:expr, $expire:ident, $pexpire:ident, $expireat:ident, $pexpireat:ident, $ttl:ident, $pttl:ident, $persist:ident) => {
        pub async fn $expire(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            expire_generic(db, $kind, stringify!($expire), args, false).await
        }
        pub async fn $pexpire(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            expire_generic(db, $kind, stringify!($pexpire), args, true).await
        }
        pub async fn $expireat(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            expireat_generic(db, $kind, stringify!($expireat), args, false).await
        }
        pub async fn $pexpireat(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            expireat_generic(db, $kind, stringify!($pexpireat), args, true).await
        }
        pub async fn $ttl(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            ttl_generic(db, $kind, stringify!($ttl), args, false).await
        }
        pub async fn $pttl(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            ttl_generic(db, $kind, stringify!($pttl), args, true).await
        }
        pub async fn $persist(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
            persist_generic(db, $kind, stringify!($persist), args).await
        }
    };
}

kind_expiry_commands!(Kind::Kv, expire, pexpire, expireat, pexpireat, ttl, pttl, persist);
kind_expiry_commands!(Kind::List, lexpire, lpexpire, lexpireat, lpexpireat, lttl, lpttl, lpersist);
kind_expiry_commands!(Kind::Hash, hexpire, hpexpire, hexpireat, hpexpireat, httl, hpttl, hpersist);
kind_expiry_commands!(Kind::ZSet, zexpire, zpexpire, zexpireat, zpexpireat, zttl, zpttl, zpersist);
kind_expiry_commands!(Kind::Bitmap, bexpire, bpexpire, bexpireat, bpexpireat, bttl, bpttl, bpersist);
