//! Domain errors for the rave research loop.

use thiserror::Error;

use super::models::state::OrchestratorState;

/// Errors raised by the external capabilities (completion, search, page fetch).
///
/// Adapters classify their failures so retry logic can tell transient
/// problems (network, timeouts, rate limits, 5xx) from permanent ones.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Connection or transport failure
    #[error("Request failed: {0}")]
    Request(String),

    /// The call did not finish within its deadline
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Provider asked us to slow down (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Provider-side failure (HTTP 5xx)
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Invalid or missing credentials (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Request rejected by the provider (other 4xx)
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request itself cannot be served (bad URL, unsupported content)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Adapter is missing required configuration (API key, base URL)
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl ServiceError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Timeout(_) | Self::RateLimited | Self::Server { .. }
        )
    }

    /// Returns true if the failure is a schema violation of a structured response.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Run-level error taxonomy.
///
/// Cancellation is not an error; a cancelled run ends in
/// [`OrchestratorState::Cancelled`] and is reported through `RunOutcome`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RaveError {
    /// Missing or invalid input, rejected before the loop starts
    #[error("Invalid input: {0}")]
    Input(String),

    /// An external call made by a step failed
    #[error("{state} failed: {source}")]
    ExternalCall {
        state: OrchestratorState,
        #[source]
        source: ServiceError,
    },

    /// A structured response could not be parsed into its expected shape
    #[error("{state} returned an invalid response: {message}")]
    Schema {
        state: OrchestratorState,
        message: String,
    },

    /// A step exceeded its deadline
    #[error("{state} timed out after {seconds}s")]
    Timeout { state: OrchestratorState, seconds: u64 },

    /// The state machine was asked to take an edge that is not in its table
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: OrchestratorState,
        to: OrchestratorState,
    },

    /// A second run was started while one is still in flight
    #[error("A run is already in progress")]
    AlreadyRunning,
}

impl RaveError {
    /// Attribute an adapter failure to the step that made the call.
    pub fn from_service(state: OrchestratorState, err: ServiceError) -> Self {
        match err {
            ServiceError::Malformed(message) => Self::Schema { state, message },
            source => Self::ExternalCall { state, source },
        }
    }

    /// The step the failure belongs to, if any.
    pub fn failed_state(&self) -> Option<OrchestratorState> {
        match self {
            Self::ExternalCall { state, .. }
            | Self::Schema { state, .. }
            | Self::Timeout { state, .. } => Some(*state),
            Self::InvalidTransition { from, .. } => Some(*from),
            Self::Input(_) | Self::AlreadyRunning => None,
        }
    }
}

/// Result alias used across the domain and application layers.
pub type RaveResult<T> = Result<T, RaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ServiceError::RateLimited.is_transient());
        assert!(ServiceError::Timeout(30).is_transient());
        assert!(ServiceError::Request("connection reset".to_string()).is_transient());
        assert!(ServiceError::Server {
            status: 503,
            body: "unavailable".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!ServiceError::Unauthorized("bad key".to_string()).is_transient());
        assert!(!ServiceError::Malformed("not json".to_string()).is_transient());
        assert!(!ServiceError::InvalidRequest("ftp://x".to_string()).is_transient());
        assert!(!ServiceError::Rejected {
            status: 400,
            body: "bad".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_malformed_maps_to_schema_error() {
        let err = RaveError::from_service(
            OrchestratorState::Scoring,
            ServiceError::Malformed("missing scores".to_string()),
        );
        assert!(matches!(err, RaveError::Schema { .. }));
        assert_eq!(err.failed_state(), Some(OrchestratorState::Scoring));
    }

    #[test]
    fn test_network_failure_maps_to_external_call() {
        let err = RaveError::from_service(
            OrchestratorState::Searching,
            ServiceError::Request("dns".to_string()),
        );
        assert!(matches!(err, RaveError::ExternalCall { .. }));
        assert!(err.to_string().contains("searching"));
    }
}
