//! Shared HTTP plumbing for the provider adapters: client construction,
//! error classification and retry.

pub mod retry;

pub use retry::RetryPolicy;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::domain::errors::ServiceError;

/// Longest error body kept in a [`ServiceError`].
const MAX_ERROR_BODY: usize = 512;

/// Build a pooled client with a per-request timeout.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .pool_max_idle_per_host(10)
        .tcp_nodelay(true)
        .build()
        .context("Failed to build HTTP client")
}

/// Map a non-success status to a classified error.
pub fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let body = truncate_body(body);
    match status.as_u16() {
        429 => ServiceError::RateLimited,
        401 | 403 => ServiceError::Unauthorized(body),
        408 => ServiceError::Request(format!("request timeout: {body}")),
        code if status.is_server_error() => ServiceError::Server { status: code, body },
        code => ServiceError::Rejected { status: code, body },
    }
}

/// Map a transport-level failure.
pub fn classify_transport(err: &reqwest::Error, timeout: Duration) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout(timeout.as_secs())
    } else if err.is_decode() {
        ServiceError::Malformed(err.to_string())
    } else {
        ServiceError::Request(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS, ""), ServiceError::RateLimited);
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            ServiceError::Unauthorized(_)
        ));
        assert!(classify_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, "").is_transient());
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, "missing"),
            ServiceError::Rejected {
                status: 404,
                body: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_error_body_truncated() {
        let long = "x".repeat(2_000);
        match classify_status(StatusCode::BAD_REQUEST, &long) {
            ServiceError::Rejected { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY + 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
