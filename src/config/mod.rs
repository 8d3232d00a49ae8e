//! Configuration (SPEC_FULL.md §A.3): static boot-time fields loaded from
//! TOML plus a small dynamic subset settable at runtime via `CONFIG SET`.

mod dynamic_config;
mod static_config;

pub use dynamic_config::DynamicConfig;
pub use static_config::StaticConfig;

use std::sync::Arc;

/// The engine's full configuration: an immutable [`StaticConfig`] plus a
/// shared handle to the live-tunable [`DynamicConfig`] derived from it.
pub struct Config {
    pub static_config: StaticConfig,
    pub dynamic: Arc<DynamicConfig>,
}

impl Config {
    pub fn new(static_config: StaticConfig) -> Self {
        let dynamic = Arc::new(DynamicConfig::from_static(&static_config));
        Self { static_config, dynamic }
    }

    pub async fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        Ok(Self::new(StaticConfig::from_file(path).await?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(StaticConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_derives_from_static_defaults() {
        let config = Config::default();
        assert_eq!(config.dynamic.get("max_sync_records"), Some("64".to_string()));
    }
}
