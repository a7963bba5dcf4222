//! Error types for FlightDesk

use std::io;

use thiserror::Error;

/// Result type alias for FlightDesk
pub type Result<T> = std::result::Result<T, Error>;

/// FlightDesk errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream provider answered with a non-2xx status
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Upstream answered 2xx but the payload was unusable
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid chat request from a client
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same upstream call may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// HTTP status to report to a client of the proxy
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::Json(_) => 400,
            Self::Upstream { .. } | Self::Protocol(_) | Self::Http(_) => 502,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_retryable_statuses() {
        let server_error = Error::Upstream {
            status: 503,
            body: String::new(),
        };
        let rate_limited = Error::Upstream {
            status: 429,
            body: String::new(),
        };
        let unauthorized = Error::Upstream {
            status: 401,
            body: String::new(),
        };
        assert!(server_error.is_retryable());
        assert!(rate_limited.is_retryable());
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn test_non_transport_errors_not_retryable() {
        assert!(!Error::Config("x".into()).is_retryable());
        assert!(!Error::Protocol("x".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidRequest("empty".into()).status_code(), 400);
        assert_eq!(Error::Protocol("no choices".into()).status_code(), 502);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_display() {
        let err = Error::Upstream {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.to_string(), "Upstream returned HTTP 500: oops");
    }
}
