//! Error types for lpt-core

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using lpt-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lpt-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Sync was requested without a bound account
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Remote basket does not exist yet
    #[error("Remote basket not found: {0}")]
    NotFound(String),

    /// Remote endpoint answered with a non-2xx status other than 404
    #[error("Remote API error: {status} {status_text}")]
    Transport { status: u16, status_text: String },

    /// HTTP client error (connection, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote payload could not be interpreted as a basket document
    #[error("Malformed remote data: {0}")]
    MalformedRemoteData(String),

    /// A queued request exceeded its time budget
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The rate limiter dropped a request before it produced a result
    #[error("Queued request was dropped before completion")]
    RequestDropped,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True when the error means "no remote data yet" rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
