//! List commands. Each call reads the whole encoded list, mutates it in
//! memory, and writes it back through [`crate::db::value_ops`] — the
//! codec module (out of scope per spec.md §1) has no partial-field update
//! story, so this is the one honest way to express list mutation against
//! it.

use super::{not_an_integer, wrong_args};
use crate::codec::{self, Kind};
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use std::collections::VecDeque;
use std::sync::Arc;

async fn load(db: &Arc<LogicalDb>, key: &[u8]) -> Result<VecDeque<Vec<u8>>, RespValue> {
    let data_key = codec::data_key(Kind::List, db.index, key);
    match db.get(&data_key) {
        Ok(Some(bytes)) => codec::decode_list(&bytes).map_err(|e| RespValue::Error(format!("ERR {}", e))),
        Ok(None) => Ok(VecDeque::new()),
        Err(e) => Err(RespValue::Error(format!("ERR {}", e))),
    }
}

async fn store(db: &Arc<LogicalDb>, key: &[u8], list: VecDeque<Vec<u8>>) -> RespValue {
    let len = list.len() as i64;
    if list.is_empty() {
        return match db.delete_key(Kind::List, key).await {
            Ok(_) => RespValue::Integer(0),
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        };
    }
    match db.write_value(Kind::List, key, codec::encode_list(&list), false).await {
        Ok(()) => RespValue::Integer(len),
        Err(e) => RespValue::Error(format!("ERR {}", e)),
    }
}

pub async fn lpush(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 2 {
        return wrong_args("lpush");
    }
    let mut list = match load(db, &args[0]).await {
        Ok(l) => l,
        Err(e) => return e,
    };
    for v in &args[1..] {
        list.push_front(v.clone());
    }
    store(db, &args[0], list).await
}

pub async fn rpush(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 2 {
        return wrong_args("rpush");
    }
    let mut list = match load(db, &args[0]).await {
        Ok(l) => l,
        Err(e) => return e,
    };
    for v in &args[1..] {
        list.push_back(v.clone());
    }
    store(db, &args[0], list).await
}

pub async fn lpop(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("lpop");
    }
    let mut list = match load(db, &args[0]).await {
        Ok(l) => l,
        Err(e) => return e,
    };
    let popped = list.pop_front();
    let reply = match &popped {
        Some(v) => RespValue::BulkString(Some(v.clone())),
        None => RespValue::BulkString(None),
    };
    if let RespValue::Error(_) = store(db, &args[0], list).await {
        return reply;
    }
    reply
}

pub async fn rpop(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("rpop");
    }
    let mut list = match load(db, &args[0]).await {
        Ok(l) => l,
        Err(e) => return e,
    };
    let popped = list.pop_back();
    let reply = match &popped {
        Some(v) => RespValue::BulkString(Some(v.clone())),
        None => RespValue::BulkString(None),
    };
    if let RespValue::Error(_) = store(db, &args[0], list).await {
        return reply;
    }
    reply
}

pub async fn llen(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("llen");
    }
    match load(db, &args[0]).await {
        Ok(l) => RespValue::Integer(l.len() as i64),
        Err(e) => e,
    }
}

/// `LRANGE key start stop`, Redis-style indices: negative counts from the
/// tail, both bounds inclusive and clamped to the list's span.
pub async fn lrange(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 3 {
        return wrong_args("lrange");
    }
    let list = match load(db, &args[0]).await {
        Ok(l) => l,
        Err(e) => return e,
    };
    let (Some(start), Some(stop)) = (super::parse_i64(&args[1]), super::parse_i64(&args[2])) else {
        return not_an_integer();
    };

    let len = list.len() as i64;
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len + i).max(0)
        } else {
            i
        }
    };
    let start = norm(start);
    let stop = norm(stop).min(len - 1);
    if len == 0 || start > stop || start >= len {
        return RespValue::Array(Some(vec![]));
    }

    let items = list
        .iter()
        .skip(start as usize)
        .take((stop - start + 1) as usize)
        .map(|v| RespValue::BulkString(Some(v.clone())))
        .collect();
    RespValue::Array(Some(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbBank;
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn test_rpush_then_lrange() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);

        rpush(&db, &[b"k".to_vec(), b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).await;
        let r = lrange(&db, &[b"k".to_vec(), b"0".to_vec(), b"-1".to_vec()]).await;
        assert_eq!(
            r,
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some(b"a".to_vec())),
                RespValue::BulkString(Some(b"b".to_vec())),
                RespValue::BulkString(Some(b"c".to_vec())),
            ]))
        );
    }

    #[tokio::test]
    async fn test_lpush_reverses_push_order() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);
        lpush(&db, &[b"k".to_vec(), b"a".to_vec(), b"b".to_vec()]).await;
        let r = lrange(&db, &[b"k".to_vec(), b"0".to_vec(), b"-1".to_vec()]).await;
        assert_eq!(
            r,
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some(b"b".to_vec())),
                RespValue::BulkString(Some(b"a".to_vec())),
            ]))
        );
    }

    #[tokio::test]
    async fn test_pop_empties_list_and_deletes_key() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);
        rpush(&db, &[b"k".to_vec(), b"a".to_vec()]).await;
        let popped = rpop(&db, &[b"k".to_vec()]).await;
        assert_eq!(popped, RespValue::BulkString(Some(b"a".to_vec())));
        assert_eq!(llen(&db, &[b"k".to_vec()]).await, RespValue::Integer(0));
    }
}
