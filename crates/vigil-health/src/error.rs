//! Error types for vigil-health crate.
//!
//! Every variant degrades to "unreachable" at the fetcher boundary; none of
//! them escape a check cycle.

use thiserror::Error;

/// Errors that can occur while fetching and parsing service health.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Network, timeout or body-decoding failure.
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Gateway rejected our credentials.
    #[error("gateway authentication failed: {0}")]
    Auth(String),

    /// Gateway answered with a non-success status.
    #[error("gateway returned status {status} for resource {resource}")]
    UpstreamStatus { resource: String, status: u16 },

    /// Gateway response does not contain the requested resource.
    #[error("resource {0} missing from gateway response")]
    UpstreamDataMissing(String),

    /// Resource entry does not have the expected shape.
    #[error("malformed payload for resource {resource}: {reason}")]
    MalformedPayload { resource: String, reason: String },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for health operations.
pub type HealthResult<T> = Result<T, HealthError>;
