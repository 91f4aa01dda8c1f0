//! Error types for client internals
//!
//! These never cross the public request surface: `ApiClient` converts them
//! into an `ApiError` inside the envelope. Construction-time failures
//! (`ApiClient::new`) are the exception and return `Error` directly.

/// Errors raised while building or sending a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("request could not be built: {0}")]
    InvalidRequest(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_builder() {
            Error::InvalidRequest(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
