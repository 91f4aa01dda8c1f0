//! Client configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Applied to every transport call unless a call overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("marketplace-client/", env!("CARGO_PKG_VERSION"));

/// Where and how the client talks to the API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to, e.g. `https://api.example.com/v1`
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }

    /// Join a request path onto the base URL with exactly one slash between.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("https://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("marketplace-client/"));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ClientConfig::new("api.example.com").validate().unwrap_err();
        assert!(err.to_string().contains("base_url must start with http"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ClientConfig::new("http://localhost").with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn url_for_normalizes_slashes() {
        let config = ClientConfig::new("https://api.example.com/v1/");
        assert_eq!(config.url_for("/listings"), "https://api.example.com/v1/listings");
        assert_eq!(config.url_for("listings/7"), "https://api.example.com/v1/listings/7");
    }
}
