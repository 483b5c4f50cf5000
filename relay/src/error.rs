//! Error types for telemetry-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_types::TypesError;

/// Main error type for relay startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Bind address could not be parsed.
    #[error("invalid bind address {address}: {source}")]
    BindAddress {
        /// The configured address.
        address: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a single HTTP request.
///
/// None of these touch the store: a request that fails is rejected before
/// any `put_*` call.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Query parameter missing or malformed.
    #[error("bad request: {0}")]
    Parameter(#[from] TypesError),

    /// The request body could not be read.
    #[error("failed to read request body: {reason}")]
    Body {
        /// Status chosen by the body extractor (400 or 413).
        status: StatusCode,
        /// Extractor error text.
        reason: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {reason}")]
    RateLimited {
        /// Reason for rate limiting.
        reason: String,
    },
}

impl RequestError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Parameter(_) => StatusCode::BAD_REQUEST,
            Self::Body { status, .. } => *status,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Result type alias for relay startup.
pub type Result<T> = std::result::Result<T, RelayError>;
