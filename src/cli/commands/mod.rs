//! CLI command implementations.

pub mod ask;
pub mod config;
pub mod models;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Load the effective configuration: an explicit file, or `.rave/` under the
/// working directory with environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Install the global subscriber described by the `logging` section.
pub fn init_logging(config: &Config) -> Result<LoggerImpl> {
    let log_config = LogConfig::try_from(&config.logging).context("Invalid logging configuration")?;
    LoggerImpl::init(&log_config)
}

/// Log one warning per configured model missing from the catalog.
pub fn warn_unknown_models(config: &Config) {
    for (step, model) in ConfigLoader::unknown_models(config) {
        warn!(step, model = %model, "Model is not in the catalog, using it anyway");
    }
}
