use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;

/// Instructions plus content sent to a completion model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Text completion against a named model.
///
/// Implementations must be safe to call concurrently and must classify
/// failures through [`ServiceError`].
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &Prompt, model: &str) -> Result<String, ServiceError>;
}
