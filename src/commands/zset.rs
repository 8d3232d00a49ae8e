//! Sorted-set commands over [`crate::codec::ZSetValue`].

use super::{not_an_integer, wrong_args};
use crate::codec::{self, Kind, ZSetValue};
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use ordered_float::OrderedFloat;
use std::sync::Arc;

async fn load(db: &Arc<LogicalDb>, key: &[u8]) -> Result<ZSetValue, RespValue> {
    let data_key = codec::data_key(Kind::ZSet, db.index, key);
    match db.get(&data_key) {
        Ok(Some(bytes)) => codec::decode_zset(&bytes).map_err(|e| RespValue::Error(format!("ERR {}", e))),
        Ok(None) => Ok(ZSetValue::new()),
        Err(e) => Err(RespValue::Error(format!("ERR {}", e))),
    }
}

async fn store(db: &Arc<LogicalDb>, key: &[u8], zset: ZSetValue) -> Result<(), RespValue> {
    if zset.members.is_empty() {
        db.delete_key(Kind::ZSet, key)
            .await
            .map(|_| ())
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    } else {
        db.write_value(Kind::ZSet, key, codec::encode_zset(&zset), false)
            .await
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    }
}

fn parse_score(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}

pub async fn zadd(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 3 || args.len() % 2 == 0 {
        return wrong_args("zadd");
    }
    let mut zset = match load(db, &args[0]).await {
        Ok(z) => z,
        Err(e) => return e,
    };
    let mut added = 0i64;
    for pair in args[1..].chunks(2) {
        let Some(score) = parse_score(&pair[0]) else {
            return RespValue::Error("ERR value is not a valid float".to_string());
        };
        if zset.members.insert(pair[1].clone(), OrderedFloat(score)).is_none() {
            added += 1;
        }
    }
    if let Err(e) = store(db, &args[0], zset).await {
        return e;
    }
    RespValue::Integer(added)
}

pub async fn zscore(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 2 {
        return wrong_args("zscore");
    }
    let zset = match load(db, &args[0]).await {
        Ok(z) => z,
        Err(e) => return e,
    };
    match zset.members.get(&args[1]) {
        Some(score) => RespValue::BulkString(Some(score.into_inner().to_string().into_bytes())),
        None => RespValue::BulkString(None),
    }
}

pub async fn zcard(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("zcard");
    }
    match load(db, &args[0]).await {
        Ok(z) => RespValue::Integer(z.members.len() as i64),
        Err(e) => e,
    }
}

pub async fn zrem(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 2 {
        return wrong_args("zrem");
    }
    let mut zset = match load(db, &args[0]).await {
        Ok(z) => z,
        Err(e) => return e,
    };
    let mut removed = 0i64;
    for member in &args[1..] {
        if zset.members.remove(member).is_some() {
            removed += 1;
        }
    }
    if let Err(e) = store(db, &args[0], zset).await {
        return e;
    }
    RespValue::Integer(removed)
}

pub async fn zincrby(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 3 {
        return wrong_args("zincrby");
    }
    let Some(delta) = parse_score(&args[1]) else {
        return not_an_integer();
    };
    let mut zset = match load(db, &args[0]).await {
        Ok(z) => z,
        Err(e) => return e,
    };
    let new_score = zset.members.get(&args[2]).map(|s| s.into_inner()).unwrap_or(0.0) + delta;
    zset.members.insert(args[2].clone(), OrderedFloat(new_score));
    if let Err(e) = store(db, &args[0], zset).await {
        return e;
    }
    RespValue::BulkString(Some(new_score.to_string().into_bytes()))
}
