use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::catalog;
use crate::domain::models::config::{Config, RetryConfig};

/// Environment variables consulted when no API key is configured.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("Invalid {0}: {1}. Must be within [0, 1]")]
    OutOfUnitRange(&'static str, f64),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid {0}: cannot be 0")]
    ZeroValue(&'static str),

    #[error("Model for step '{0}' cannot be empty")]
    EmptyModel(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error(
        "Invalid backoff configuration for {0}: initial_backoff_ms ({1}) must be less than max_backoff_ms ({2})"
    )]
    InvalidBackoff(&'static str, u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .rave/config.yaml
    /// 3. .rave/local.yaml (optional local overrides)
    /// 4. Environment variables (RAVE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with `.rave/` resolved under `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(".rave");
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("RAVE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::resolve_api_keys(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::resolve_api_keys(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Fill missing API keys from the providers' conventional variables.
    pub fn resolve_api_keys(config: &mut Config) {
        if config.completion.api_key.is_none() {
            config.completion.api_key = std::env::var(OPENAI_API_KEY_VAR).ok().filter(|k| !k.is_empty());
        }
        if config.search.api_key.is_none() {
            config.search.api_key = std::env::var(TAVILY_API_KEY_VAR).ok().filter(|k| !k.is_empty());
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let research = &config.research;
        if research.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(research.max_iterations));
        }
        check_unit("score_threshold", research.score_threshold)?;
        if let Some(delta) = research.stagnation_delta {
            check_unit("stagnation_delta", delta)?;
        }
        if research.step_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("research.step_timeout_secs"));
        }

        for (step, model) in config.models.entries() {
            if model.trim().is_empty() {
                return Err(ConfigError::EmptyModel(step));
            }
        }

        let rate = config.completion.requests_per_second;
        if rate <= 0.0 || !rate.is_finite() {
            return Err(ConfigError::InvalidRateLimit(
                config.completion.requests_per_second,
            ));
        }

        let timeouts = [
            ("completion.timeout_secs", config.completion.timeout_secs),
            ("search.timeout_secs", config.search.timeout_secs),
            ("fetch.timeout_secs", config.fetch.timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::ZeroValue(name));
            }
        }
        if config.search.max_results == 0 {
            return Err(ConfigError::ZeroValue("search.max_results"));
        }
        if config.fetch.max_content_chars == 0 {
            return Err(ConfigError::ZeroValue("fetch.max_content_chars"));
        }

        check_backoff("completion.retry", &config.completion.retry)?;
        check_backoff("search.retry", &config.search.retry)?;
        check_backoff("fetch.retry", &config.fetch.retry)?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }

    /// `(step, model)` pairs naming models missing from the catalog.
    ///
    /// Unknown models are allowed; callers log these as warnings.
    pub fn unknown_models(config: &Config) -> Vec<(&'static str, String)> {
        config
            .models
            .entries()
            .into_iter()
            .filter(|(_, model)| !catalog::is_known(model))
            .map(|(step, model)| (step, model.to_string()))
            .collect()
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange(name, value))
    }
}

fn check_backoff(name: &'static str, retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.initial_backoff_ms >= retry.max_backoff_ms {
        return Err(ConfigError::InvalidBackoff(
            name,
            retry.initial_backoff_ms,
            retry.max_backoff_ms,
        ));
    }
    Ok(())
}
