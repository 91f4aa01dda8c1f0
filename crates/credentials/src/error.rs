//! Error types for credential storage

/// Errors from credential store writes. Reads never fail: an unreadable or
/// missing record is reported as "no token".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
