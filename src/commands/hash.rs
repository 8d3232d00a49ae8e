//! Hash commands, following the same read-mutate-write shape as
//! [`super::list`] over [`crate::codec::encode_hash`]/`decode_hash`.

use super::wrong_args;
use crate::codec::{self, Kind};
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use std::collections::BTreeMap;
use std::sync::Arc;

async fn load(db: &Arc<LogicalDb>, key: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, RespValue> {
    let data_key = codec::data_key(Kind::Hash, db.index, key);
    match db.get(&data_key) {
        Ok(Some(bytes)) => codec::decode_hash(&bytes).map_err(|e| RespValue::Error(format!("ERR {}", e))),
        Ok(None) => Ok(BTreeMap::new()),
        Err(e) => Err(RespValue::Error(format!("ERR {}", e))),
    }
}

async fn store(db: &Arc<LogicalDb>, key: &[u8], hash: BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), RespValue> {
    if hash.is_empty() {
        db.delete_key(Kind::Hash, key)
            .await
            .map(|_| ())
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    } else {
        db.write_value(Kind::Hash, key, codec::encode_hash(&hash), false)
            .await
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    }
}

pub async fn hset(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 3 || args.len() % 2 == 0 {
        return wrong_args("hset");
    }
    let mut hash = match load(db, &args[0]).await {
        Ok(h) => h,
        Err(e) => return e,
    };
    let mut added = 0i64;
    for pair in args[1..].chunks(2) {
        if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
            added += 1;
        }
    }
    if let Err(e) = store(db, &args[0], hash).await {
        return e;
    }
    RespValue::Integer(added)
}

pub async fn hget(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 2 {
        return wrong_args("hget");
    }
    let hash = match load(db, &args[0]).await {
        Ok(h) => h,
        Err(e) => return e,
    };
    match hash.get(&args[1]) {
        Some(v) => RespValue::BulkString(Some(v.clone())),
        None => RespValue::BulkString(None),
    }
}

pub async fn hdel(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 2 {
        return wrong_args("hdel");
    }
    let mut hash = match load(db, &args[0]).await {
        Ok(h) => h,
        Err(e) => return e,
    };
    let mut removed = 0i64;
    for field in &args[1..] {
        if hash.remove(field).is_some() {
            removed += 1;
        }
    }
    if let Err(e) = store(db, &args[0], hash).await {
        return e;
    }
    RespValue::Integer(removed)
}

pub async fn hlen(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("hlen");
    }
    match load(db, &args[0]).await {
        Ok(h) => RespValue::Integer(h.len() as i64),
        Err(e) => e,
    }
}
