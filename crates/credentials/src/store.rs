//! Credential store interface consumed by the API client

use std::future::Future;
use std::pin::Pin;

use common::Secret;

use crate::error::Result;
use crate::token::TokenPair;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent holder of the access and refresh tokens.
///
/// Getters must be callable before anything was stored and return `None`
/// in that case. The client does not lock the store; implementations make
/// each method atomic, including the conditional writes used to keep a
/// refresh from overwriting a newer login.
///
/// Uses `Pin<Box<dyn Future>>` return types so the client can hold an
/// `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    fn get_token(&self) -> StoreFuture<'_, Option<Secret<String>>>;

    fn set_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>>;

    fn get_refresh_token(&self) -> StoreFuture<'_, Option<Secret<String>>>;

    fn set_refresh_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>>;

    /// Clear both tokens. Succeeds when nothing was stored.
    fn remove_tokens(&self) -> StoreFuture<'_, Result<()>>;

    /// Replace the whole session in one step (login). A pair without a
    /// refresh token leaves none stored.
    fn replace_tokens(&self, pair: TokenPair) -> StoreFuture<'_, Result<()>>;

    /// Store a refreshed pair only if the stored refresh token still equals
    /// `expected`. The comparison and the write happen under one lock.
    /// A pair without a refresh token keeps `expected`. Returns whether the
    /// pair was written.
    fn store_pair_if(
        &self,
        expected: Secret<String>,
        pair: TokenPair,
    ) -> StoreFuture<'_, Result<bool>>;

    /// Clear both tokens only if the stored refresh token equals
    /// `expected` (`None` matching an empty slot). Returns whether anything
    /// was cleared.
    fn remove_tokens_if(&self, expected: Option<Secret<String>>) -> StoreFuture<'_, Result<bool>>;
}
