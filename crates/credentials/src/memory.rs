//! In-memory credential store for tests and ephemeral sessions

use common::Secret;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::store::{CredentialStore, StoreFuture};
use crate::token::TokenPair;

#[derive(Default)]
struct Tokens {
    access: Option<Secret<String>>,
    refresh: Option<Secret<String>>,
}

/// Credential store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<Tokens>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a logged-in session.
    pub fn with_tokens(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(Tokens {
                access: Some(Secret::new(access.into())),
                refresh: Some(Secret::new(refresh.into())),
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.access.clone() })
    }

    fn set_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.state.lock().await.access = Some(token);
            Ok(())
        })
    }

    fn get_refresh_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.refresh.clone() })
    }

    fn set_refresh_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.state.lock().await.refresh = Some(token);
            Ok(())
        })
    }

    fn remove_tokens(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.access = None;
            state.refresh = None;
            debug!("cleared in-memory credentials");
            Ok(())
        })
    }

    fn replace_tokens(&self, pair: TokenPair) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.access = Some(Secret::new(pair.access_token));
            state.refresh = pair.refresh_token.map(Secret::new);
            Ok(())
        })
    }

    fn store_pair_if(
        &self,
        expected: Secret<String>,
        pair: TokenPair,
    ) -> StoreFuture<'_, Result<bool>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.refresh.as_ref() != Some(&expected) {
                return Ok(false);
            }
            state.access = Some(Secret::new(pair.access_token));
            if let Some(refresh) = pair.refresh_token {
                state.refresh = Some(Secret::new(refresh));
            }
            Ok(true)
        })
    }

    fn remove_tokens_if(&self, expected: Option<Secret<String>>) -> StoreFuture<'_, Result<bool>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.refresh != expected {
                return Ok(false);
            }
            *state = Tokens::default();
            debug!("cleared in-memory credentials");
            Ok(true)
        })
    }
}
