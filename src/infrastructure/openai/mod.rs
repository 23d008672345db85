//! OpenAI-compatible chat completions adapter.

pub mod client;
pub mod types;

pub use client::OpenAiClient;
