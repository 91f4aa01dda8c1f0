//! Command errors

use thiserror::Error;

/// Problems running a command before any request is made. API failures are
/// not errors here: they come back as an envelope and are printed like any
/// result.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("MARKETPLACE_PASSWORD must be set to log in")]
    MissingPassword,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_variable() {
        assert!(Error::MissingPassword.to_string().contains("MARKETPLACE_PASSWORD"));
    }
}
