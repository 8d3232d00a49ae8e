//! Dump / snapshot codec (spec.md C2, §4.2).
//!
//! `aofFileIndex:i64-be | aofFileOffset:i64-be | [ keyLen:u16-be |
//! snappy(key) | valueLen:u32-be | snappy(value) ]*`. The 16-byte header
//! anchors the snapshot to a point in the AOF stream so a follower that
//! loads the dump knows where to resume tailing. Grounded on
//! `examples/original_source/server/dump.go` (header layout, per-record
//! compression) and on `examples/vectordotdev-vector`'s use of the `snap`
//! crate for this compression family.

use crate::persistence::aof::Anchor;
use crate::store::{ByteStore, KeyRange};
use std::ops::Bound;
use tokio::sync::RwLock;

/// Encode the entire backing store as a dump, anchored at `anchor`.
///
/// Iterates the store in key order, compressing each key and value
/// independently with `snap`'s frame format. This does not take a
/// consistent snapshot (spec.md §4.2: "a known weakness") — callers hold
/// `write_lock` for the duration so no writer observes a half-iterated
/// store.
pub async fn encode(
    store: &dyn ByteStore,
    anchor: Anchor,
    write_lock: &RwLock<()>,
) -> anyhow::Result<Vec<u8>> {
    let _guard = write_lock.write().await;

    let mut out = Vec::new();
    out.extend_from_slice(&anchor.file_index.to_be_bytes());
    out.extend_from_slice(&anchor.file_offset.to_be_bytes());

    let all = store.range(KeyRange {
        start: Bound::Unbounded,
        end: Bound::Unbounded,
    })?;

    for (key, value) in all {
        let key_c = compress(&key)?;
        let value_c = compress(&value)?;

        if key_c.len() > u16::MAX as usize {
            anyhow::bail!("dump key too large to encode: {} bytes", key_c.len());
        }
        out.extend_from_slice(&(key_c.len() as u16).to_be_bytes());
        out.extend_from_slice(&key_c);
        out.extend_from_slice(&(value_c.len() as u32).to_be_bytes());
        out.extend_from_slice(&value_c);
    }

    Ok(out)
}

/// Decode a dump produced by [`encode`] and issue direct puts into `store`,
/// returning the AOF anchor the dump was taken at. Holds `write_lock` for
/// the duration so no concurrent writer observes a half-loaded store
/// (spec.md §4.2).
pub async fn decode(store: &dyn ByteStore, bytes: &[u8], write_lock: &RwLock<()>) -> anyhow::Result<Anchor> {
    let _guard = write_lock.write().await;

    if bytes.len() < 16 {
        anyhow::bail!("dump too short for anchor header: {} bytes", bytes.len());
    }
    let file_index = i64::from_be_bytes(bytes[0..8].try_into().unwrap());
    let file_offset = i64::from_be_bytes(bytes[8..16].try_into().unwrap());
    let anchor = Anchor { file_index, file_offset };

    let mut cursor = &bytes[16..];
    while !cursor.is_empty() {
        if cursor.len() < 2 {
            anyhow::bail!("truncated dump: missing key length");
        }
        let key_len = u16::from_be_bytes(cursor[0..2].try_into().unwrap()) as usize;
        cursor = &cursor[2..];
        if cursor.len() < key_len {
            anyhow::bail!("truncated dump: missing key bytes");
        }
        let key = decompress(&cursor[..key_len])?;
        cursor = &cursor[key_len..];

        if cursor.len() < 4 {
            anyhow::bail!("truncated dump: missing value length");
        }
        let value_len = u32::from_be_bytes(cursor[0..4].try_into().unwrap()) as usize;
        cursor = &cursor[4..];
        if cursor.len() < value_len {
            anyhow::bail!("truncated dump: missing value bytes");
        }
        let value = decompress(&cursor[..value_len])?;
        cursor = &cursor[value_len..];

        store.put(key, value)?;
    }

    Ok(anchor)
}

fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    Ok(snap::raw::Encoder::new().compress_vec(data)?)
}

fn decompress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    Ok(snap::raw::Decoder::new().decompress_vec(data)?)
}
