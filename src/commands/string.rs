//! Kv (string) commands. Grounded on the teacher's `commands::string`
//! handler shapes, rewritten to operate on a [`crate::db::LogicalDb`]
//! through [`crate::db::value_ops`] instead of the teacher's in-memory
//! `Database`/`RedisValue` model.

use super::{bulk, nil, ok, wrong_args};
use crate::codec::Kind;
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use std::sync::Arc;

pub async fn get(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("get");
    }
    let key = crate::codec::data_key(Kind::Kv, db.index, &args[0]);
    match db.get(&key) {
        Ok(Some(v)) => bulk(v),
        Ok(None) => nil(),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

pub async fn set(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 2 {
        return wrong_args("set");
    }
    match db.write_value(Kind::Kv, &args[0], args[1].clone(), true).await {
        Ok(()) => ok(),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

pub async fn del(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.is_empty() {
        return wrong_args("del");
    }
    let mut n = 0i64;
    for key in args {
        match db.delete_key(Kind::Kv, key).await {
            Ok(true) => n += 1,
            Ok(false) => {}
            Err(e) => return RespValue::Error(format!("ERR {}", e)),
        }
    }
    RespValue::Integer(n)
}
