//! Generic per-kind value and TTL operations shared by the command
//! modules. Every data kind stores its primary value at
//! [`codec::data_key`] and, when a deadline is armed, mirrors it at two
//! more keys: the deadline-ordered [`codec::expire_key`] the expiration
//! cycle (C5) scans, and a forward [`codec::ttl_key`] pointer so `TTL`/
//! `PERSIST`/re-arming an expiration can find the old deadline without a
//! reverse scan.
//!
//! Grounded on spec.md §4.3's invariant that every write (including
//! keyspace-counter updates) goes through the kind's batch and commits
//! before the batch releases.

use super::LogicalDb;
use crate::codec::{self, Kind};

impl LogicalDb {
    /// Write `value` at `key`, creating it if absent. `clear_ttl` should be
    /// `true` for a full-value overwrite (e.g. `SET`, which drops any
    /// existing expiration) and `false` for an incremental mutation of an
    /// existing aggregate (e.g. `LPUSH`, `HSET` on one field), which must
    /// not disturb a TTL already armed on the key.
    pub async fn write_value(
        &self,
        kind: Kind,
        key: &[u8],
        value: Vec<u8>,
        clear_ttl: bool,
    ) -> anyhow::Result<()> {
        let data_k = codec::data_key(kind, self.index, key);
        let existed = self.get(&data_k)?.is_some();
        let ttl_k = codec::ttl_key(kind, self.index, key);
        let existing_ttl = if clear_ttl { self.get(&ttl_k)? } else { None };

        let mut handle = self.batch(kind).acquire().await;
        handle.put(data_k, value);
        if let Some(old) = &existing_ttl {
            let old_deadline = codec::decode_deadline(old);
            handle.delete(codec::expire_key(kind, self.index, old_deadline, key));
            handle.delete(ttl_k);
        }
        handle.commit()?;

        if !existed {
            self.keyspace.add(kind, 1);
        }
        if existing_ttl.is_some() {
            self.keyspace.add_expires(kind, -1);
        }
        Ok(())
    }

    /// Delete the primary value at `key` and any associated TTL bookkeeping.
    /// Returns whether a key was actually removed.
    pub async fn delete_key(&self, kind: Kind, key: &[u8]) -> anyhow::Result<bool> {
        let data_k = codec::data_key(kind, self.index, key);
        if self.get(&data_k)?.is_none() {
            return Ok(false);
        }
        let ttl_k = codec::ttl_key(kind, self.index, key);
        let existing_ttl = self.get(&ttl_k)?;

        let mut handle = self.batch(kind).acquire().await;
        handle.delete(data_k);
        if let Some(old) = &existing_ttl {
            let old_deadline = codec::decode_deadline(old);
            handle.delete(codec::expire_key(kind, self.index, old_deadline, key));
            handle.delete(ttl_k);
        }
        handle.commit()?;

        self.keyspace.add(kind, -1);
        if existing_ttl.is_some() {
            self.keyspace.add_expires(kind, -1);
        }
        Ok(true)
    }

    /// Arm (or re-arm) an expiration deadline on `key`. No-op returning
    /// `false` if the key does not currently exist.
    pub async fn set_expire(&self, kind: Kind, key: &[u8], deadline_ms: u64) -> anyhow::Result<bool> {
        if self.get(&codec::data_key(kind, self.index, key))?.is_none() {
            return Ok(false);
        }
        let ttl_k = codec::ttl_key(kind, self.index, key);
        let existing = self.get(&ttl_k)?;
        let had_ttl = existing.is_some();

        let mut handle = self.batch(kind).acquire().await;
        if let Some(old) = &existing {
            let old_deadline = codec::decode_deadline(old);
            handle.delete(codec::expire_key(kind, self.index, old_deadline, key));
        }
        handle.put(codec::expire_key(kind, self.index, deadline_ms, key), Vec::new());
        handle.put(ttl_k, codec::encode_deadline(deadline_ms));
        handle.commit()?;

        if !had_ttl {
            self.keyspace.add_expires(kind, 1);
        }
        Ok(true)
    }

    /// The current deadline armed on `key`, if any.
    pub fn ttl_deadline(&self, kind: Kind, key: &[u8]) -> anyhow::Result<Option<u64>> {
        Ok(self
            .get(&codec::ttl_key(kind, self.index, key))?
            .map(|b| codec::decode_deadline(&b)))
    }

    /// Clear any expiration armed on `key`. Returns whether one was
    /// actually cleared.
    pub async fn persist(&self, kind: Kind, key: &[u8]) -> anyhow::Result<bool> {
        let ttl_k = codec::ttl_key(kind, self.index, key);
        let existing = self.get(&ttl_k)?;
        let Some(old) = existing else {
            return Ok(false);
        };
        let old_deadline = codec::decode_deadline(&old);

        let mut handle = self.batch(kind).acquire().await;
        handle.delete(codec::expire_key(kind, self.index, old_deadline, key));
        handle.delete(ttl_k);
        handle.commit()?;

        self.keyspace.add_expires(kind, -1);
        Ok(true)
    }
}
