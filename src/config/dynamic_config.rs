//! Runtime-settable configuration (SPEC_FULL.md §A.3).
//!
//! Mirrors the teacher's `config::dynamic_config` pattern — a small
//! key/value map behind a lock, validated on `set` — but trimmed to the two
//! fields this engine actually exposes for live tuning: the `SYNC` record
//! cap and the keyspace sidecar flush interval. Everything else
//! ([`super::static_config::StaticConfig`]) is fixed at boot, since
//! spec.md's Non-goals exclude "hot reconfiguration of database count" and
//! nothing in spec.md calls for a live-tunable AOF/store layout.

use anyhow::bail;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct DynamicConfig {
    values: RwLock<HashMap<String, String>>,
}

impl DynamicConfig {
    pub fn from_static(static_config: &super::StaticConfig) -> Self {
        let mut values = HashMap::new();
        values.insert(
            "max_sync_records".to_string(),
            static_config.max_sync_records.to_string(),
        );
        values.insert(
            "keyspace_flush_secs".to_string(),
            static_config.keyspace_flush_secs.to_string(),
        );
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: String, value: String) -> anyhow::Result<()> {
        self.validate(&key, &value)?;
        self.values.write().unwrap().insert(key, value);
        Ok(())
    }

    pub fn get_all(&self) -> Vec<(String, String)> {
        self.values
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn validate(&self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "max_sync_records" => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid max_sync_records value"))?;
                if n < 1 {
                    bail!("max_sync_records must be at least 1");
                }
            }
            "keyspace_flush_secs" => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid keyspace_flush_secs value"))?;
                if n < 1 {
                    bail!("keyspace_flush_secs must be at least 1");
                }
            }
            _ => bail!("unknown configuration parameter '{}'", key),
        }
        Ok(())
    }
}
