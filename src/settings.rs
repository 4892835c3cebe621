//! Engine configuration loading.
//!
//! Settings come from an optional TOML file layered with `HARDHAT_*`
//! environment variables, using `__` to reach nested keys:
//!
//! ```toml
//! staleness_window_ms = 30000
//! recording_interval_ms = 5000
//! log_retention = 1000
//!
//! [thresholds.heart_rate]
//! critical = 120.0
//! normal = 100.0
//! ```
//!
//! ```bash
//! HARDHAT_RECORDING_INTERVAL_MS=2000
//! HARDHAT_THRESHOLDS__SMOKE_SENSOR__CRITICAL=250
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use hardhat_sdk::MonitorConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HARDHAT";

/// Load and validate the engine configuration.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<MonitorConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }
    let settings = builder
        .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
        .build()
        .context("failed to read configuration")?;

    let config: MonitorConfig = settings
        .try_deserialize()
        .context("invalid configuration")?;
    config.validate()?;
    Ok(config)
}
