//! Infrastructure layer: configuration, logging and the HTTP adapters that
//! implement the domain ports.

pub mod config;
pub mod fetch;
pub mod http;
pub mod logging;
pub mod openai;
pub mod search;

pub use config::{ConfigError, ConfigLoader};
pub use fetch::HttpPageFetcher;
pub use logging::LoggerImpl;
pub use openai::OpenAiClient;
pub use search::TavilySearch;
