//! `rave models`: list the model catalog.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::table::{models_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ModelSpec, MODEL_CATALOG};

#[derive(Debug, Serialize)]
pub struct ModelsOutput {
    pub models: Vec<ModelSpec>,
}

impl CommandOutput for ModelsOutput {
    fn to_human(&self) -> String {
        render_list("model", &models_table(&self.models), self.models.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.models).unwrap_or_default()
    }
}

pub async fn execute(json: bool) -> Result<()> {
    output(
        &ModelsOutput {
            models: MODEL_CATALOG.to_vec(),
        },
        json,
    );
    Ok(())
}
