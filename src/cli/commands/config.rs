//! `rave config`: show or validate the effective configuration.

use anyhow::{Context, Result};
use serde::Serialize;

use super::load_config;
use crate::cli::output::{action_success, output, CommandOutput};
use crate::cli::types::{ConfigArgs, ConfigCommands};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

const REDACTED: &str = "********";

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    /// `step=model` pairs not found in the model catalog
    pub unknown_models: Vec<String>,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![action_success("Configuration is valid")];
        for entry in &self.unknown_models {
            lines.push(format!("  warning: unknown model {entry}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ConfigArgs, json: bool) -> Result<()> {
    let config = load_config(args.config.as_deref()).context("Configuration is invalid")?;

    match args.command {
        ConfigCommands::Show => output(
            &ConfigShowOutput {
                config: redact(config),
            },
            json,
        ),
        ConfigCommands::Validate => {
            let unknown_models = ConfigLoader::unknown_models(&config)
                .into_iter()
                .map(|(step, model)| format!("{step}={model}"))
                .collect();
            output(
                &ConfigValidateOutput {
                    valid: true,
                    unknown_models,
                },
                json,
            );
        }
    }

    Ok(())
}

/// Replace API keys so the config can be printed.
pub fn redact(mut config: Config) -> Config {
    for key in [&mut config.completion.api_key, &mut config.search.api_key] {
        if key.is_some() {
            *key = Some(REDACTED.to_string());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_keys() {
        let mut config = Config::default();
        config.completion.api_key = Some("sk-secret".to_string());

        let redacted = redact(config);
        assert_eq!(redacted.completion.api_key.as_deref(), Some(REDACTED));
        assert!(redacted.search.api_key.is_none());
        assert!(!ConfigShowOutput { config: redacted }.to_human().contains("sk-secret"));
    }

    #[test]
    fn test_validate_output_lists_unknown_models() {
        let out = ConfigValidateOutput {
            valid: true,
            unknown_models: vec!["answer=my-local-model".to_string()],
        };
        assert!(out.to_human().contains("answer=my-local-model"));
        assert_eq!(out.to_json()["valid"], true);
    }
}
