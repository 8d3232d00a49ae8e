//! Boot-time configuration (SPEC_FULL.md §A.3).
//!
//! Fields fixed for the lifetime of a process: where data lives, how big
//! AOF segments may grow, how many logical DBs exist, and the per-DB write
//! queue capacity from spec.md §4.6 ("default capacity 32"). Deserialized
//! from TOML with `serde`, mirroring the teacher's
//! `server::config::ServerConfig` but trimmed to what this engine reads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Static, boot-time configuration. Loaded once at startup and never
/// mutated; `CONFIG SET` only ever touches [`super::dynamic_config::DynamicConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory holding `aof/` and `info.json`.
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    /// Number of logical DBs in the bank (spec.md §3: "default 16").
    pub n_db: u8,
    /// AOF segment rollover threshold (spec.md §4.1).
    pub max_file_size: u64,
    /// AOF segment retention before oldest-excess pruning (spec.md §4.1).
    pub max_file_num: usize,
    /// Per-DB write-executor bounded queue capacity (spec.md §4.6).
    pub write_queue_capacity: usize,
    /// Max records `SYNC` returns per call (spec.md §6).
    pub max_sync_records: usize,
    /// Interval between periodic `info.json` flushes (SPEC_FULL.md §B).
    pub keyspace_flush_secs: u64,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind: "127.0.0.1".to_string(),
            port: 6380,
            n_db: 16,
            max_file_size: 1024 * 1024 * 1024,
            max_file_num: 128,
            write_queue_capacity: 32,
            max_sync_records: 64,
            keyspace_flush_secs: 60,
        }
    }
}

impl StaticConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub async fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&data)
    }
}
