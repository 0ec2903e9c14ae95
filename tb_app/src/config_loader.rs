use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use tb_ratelimit::BucketConfig;

/// Settings for the throttled work loop
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfigFile {
    pub bucket: BucketConfig,

    /// Number of batches to push through the bucket
    #[serde(default = "default_batches")]
    pub batches: u64,

    /// Tokens consumed per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Worker threads sharing the bucket
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_batches() -> u64 {
    100
}

fn default_batch_size() -> u64 {
    1
}

fn default_workers() -> usize {
    1
}

impl Default for ThrottleConfigFile {
    fn default() -> Self {
        Self {
            bucket: BucketConfig::with_rate(50.0, 10), // 50 tokens/sec, burst of 10
            batches: default_batches(),
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

/// Load throttle settings from `path`, overridable through `TB_*` variables
/// (e.g. `TB_BUCKET__CAPACITY=20`)
pub fn load_throttle_config<P: AsRef<Path>>(path: P) -> Result<ThrottleConfigFile, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()))
        .add_source(Environment::with_prefix("TB").prefix_separator("_").separator("__").try_parsing(true))
        .build()?;

    config.try_deserialize()
}

/// Load throttle config with fallback to default
pub fn load_throttle_config_or_default(path: &str) -> ThrottleConfigFile {
    match load_throttle_config(path) {
        Ok(config) => {
            tracing::info!("Loaded throttle config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load throttle config from {}: {}. Using defaults.", path, err);
            ThrottleConfigFile::default()
        }
    }
}
