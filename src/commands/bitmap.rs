//! Bitmap commands (spec.md §6's literal example kind: "BGET, BSETBIT,
//! BCOUNT, BOPT AND|OR|XOR|NOT, BEXPIRE, BTTL, BPERSIST, BMSETBIT, and
//! analogous commands for other kinds"). Unlike list/hash/zset, a bitmap's
//! value is the raw byte string itself — no codec framing — so these
//! operate directly on [`crate::codec::data_key`].

use super::{bulk, nil, not_an_integer, wrong_args};
use crate::codec::{self, Kind};
use crate::db::LogicalDb;
use crate::protocol::RespValue;
use std::sync::Arc;

async fn load(db: &Arc<LogicalDb>, key: &[u8]) -> Result<Vec<u8>, RespValue> {
    let data_key = codec::data_key(Kind::Bitmap, db.index, key);
    db.get(&data_key).map(|v| v.unwrap_or_default()).map_err(|e| RespValue::Error(format!("ERR {}", e)))
}

async fn store(db: &Arc<LogicalDb>, key: &[u8], bytes: Vec<u8>) -> Result<(), RespValue> {
    if bytes.is_empty() {
        db.delete_key(Kind::Bitmap, key)
            .await
            .map(|_| ())
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    } else {
        db.write_value(Kind::Bitmap, key, bytes, false)
            .await
            .map_err(|e| RespValue::Error(format!("ERR {}", e)))
    }
}

fn get_bit(bytes: &[u8], offset: u32) -> u8 {
    let byte_idx = (offset / 8) as usize;
    if byte_idx >= bytes.len() {
        return 0;
    }
    (bytes[byte_idx] >> (7 - offset % 8)) & 1
}

fn set_bit(bytes: &mut Vec<u8>, offset: u32, val: u8) -> u8 {
    let byte_idx = (offset / 8) as usize;
    if byte_idx >= bytes.len() {
        bytes.resize(byte_idx + 1, 0);
    }
    let old = get_bit(bytes, offset);
    let mask = 1u8 << (7 - offset % 8);
    if val == 1 {
        bytes[byte_idx] |= mask;
    } else {
        bytes[byte_idx] &= !mask;
    }
    old
}

pub async fn bget(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("bget");
    }
    match load(db, &args[0]).await {
        Ok(bytes) if bytes.is_empty() => nil(),
        Ok(bytes) => bulk(bytes),
        Err(e) => e,
    }
}

pub async fn bsetbit(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 3 {
        return wrong_args("bsetbit");
    }
    let Some(offset) = super::parse_i64(&args[1]).filter(|o| *o >= 0) else {
        return RespValue::Error("ERR bit offset is not an integer or out of range".to_string());
    };
    let val = match args[2].as_slice() {
        b"0" => 0u8,
        b"1" => 1u8,
        _ => return RespValue::Error("ERR bit is not an integer or out of range".to_string()),
    };
    let mut bytes = match load(db, &args[0]).await {
        Ok(b) => b,
        Err(e) => return e,
    };
    let old = set_bit(&mut bytes, offset as u32, val);
    if let Err(e) = store(db, &args[0], bytes).await {
        return e;
    }
    RespValue::Integer(old as i64)
}

pub async fn bmsetbit(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 3 || args.len() % 2 == 0 {
        return wrong_args("bmsetbit");
    }
    let mut bytes = match load(db, &args[0]).await {
        Ok(b) => b,
        Err(e) => return e,
    };
    let mut n = 0i64;
    for pair in args[1..].chunks(2) {
        let Some(offset) = super::parse_i64(&pair[0]).filter(|o| *o >= 0) else {
            return not_an_integer();
        };
        let val = match pair[1].as_slice() {
            b"0" => 0u8,
            b"1" => 1u8,
            _ => return RespValue::Error("ERR bit is not an integer or out of range".to_string()),
        };
        set_bit(&mut bytes, offset as u32, val);
        n += 1;
    }
    if let Err(e) = store(db, &args[0], bytes).await {
        return e;
    }
    RespValue::Integer(n)
}

pub async fn bcount(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() != 1 {
        return wrong_args("bcount");
    }
    match load(db, &args[0]).await {
        Ok(bytes) => RespValue::Integer(bytes.iter().map(|b| b.count_ones() as i64).sum()),
        Err(e) => e,
    }
}

/// `BOPT AND|OR|XOR|NOT destkey key [key ...]`.
pub async fn bopt(db: &Arc<LogicalDb>, args: &[Vec<u8>]) -> RespValue {
    if args.len() < 3 {
        return wrong_args("bopt");
    }
    let op = args[0].to_ascii_uppercase();
    let dest = &args[1];
    let keys = &args[2..];
    if op == b"NOT" && keys.len() != 1 {
        return RespValue::Error("ERR BOPT NOT takes exactly one source key".to_string());
    }

    let mut sources = Vec::with_capacity(keys.len());
    for k in keys {
        match load(db, k).await {
            Ok(b) => sources.push(b),
            Err(e) => return e,
        }
    }

    let max_len = sources.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut result = vec![0u8; max_len];

    match op.as_slice() {
        b"AND" => {
            result = vec![0xffu8; max_len];
            for source in &sources {
                for i in 0..max_len {
                    let b = source.get(i).copied().unwrap_or(0);
                    result[i] &= b;
                }
            }
        }
        b"OR" => {
            for source in &sources {
                for (i, b) in source.iter().enumerate() {
                    result[i] |= b;
                }
            }
        }
        b"XOR" => {
            for source in &sources {
                for (i, b) in source.iter().enumerate() {
                    result[i] ^= b;
                }
            }
        }
        b"NOT" => {
            for (i, b) in sources[0].iter().enumerate() {
                result[i] = !b;
            }
        }
        _ => return RespValue::Error("ERR BOPT operation must be AND, OR, XOR or NOT".to_string()),
    }

    let len = result.len() as i64;
    if let Err(e) = store(db, dest, result).await {
        return e;
    }
    RespValue::Integer(len)
}
