//! Catalog of known completion models.
//!
//! Used to sanity-check configured model identifiers and by `rave models`.
//! Identifiers missing from the catalog are still accepted.

use serde::Serialize;

/// Model used for every step unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Static description of a completion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub context_window: u32,
    pub supports_temperature: bool,
    pub use_cases: &'static [&'static str],
}

pub const MODEL_CATALOG: &[ModelSpec] = &[
    ModelSpec {
        name: "o3-mini",
        context_window: 128_000,
        supports_temperature: false,
        use_cases: &["Multi-step reasoning", "Complex problem solving"],
    },
    ModelSpec {
        name: "o1",
        context_window: 128_000,
        supports_temperature: false,
        use_cases: &["High-intelligence reasoning", "Complex analysis"],
    },
    ModelSpec {
        name: "o1-mini",
        context_window: 128_000,
        supports_temperature: false,
        use_cases: &["Fast reasoning", "Cost-effective analysis"],
    },
    ModelSpec {
        name: "gpt-4.1",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["Complex tasks", "High-precision responses"],
    },
    ModelSpec {
        name: "gpt-4.1-mini",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["Balanced intelligence and speed", "General purpose chat"],
    },
    ModelSpec {
        name: "gpt-4.1-nano",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["Fastest responses", "Simple tasks"],
    },
    ModelSpec {
        name: "gpt-4o",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["General purpose chat", "Answer generation"],
    },
    ModelSpec {
        name: "gpt-4o-mini",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["Focused tasks", "Query generation"],
    },
    ModelSpec {
        name: "gpt-4-turbo-preview",
        context_window: 128_000,
        supports_temperature: true,
        use_cases: &["Question improvement", "Knowledge verification"],
    },
    ModelSpec {
        name: "gpt-4",
        context_window: 8_192,
        supports_temperature: true,
        use_cases: &["Answer generation", "Question improvement"],
    },
    ModelSpec {
        name: "gpt-3.5-turbo",
        context_window: 16_384,
        supports_temperature: true,
        use_cases: &["Query generation", "Simple reasoning tasks"],
    },
];

/// Look up a model by exact identifier.
pub fn lookup(name: &str) -> Option<&'static ModelSpec> {
    MODEL_CATALOG.iter().find(|m| m.name == name)
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}
