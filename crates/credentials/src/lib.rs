//! Credential storage and auth wire types for the marketplace API
//!
//! The API client never keeps its own copy of tokens: it reads them from a
//! `CredentialStore` on every request and writes them back only after a
//! login or a successful refresh. This crate defines that store interface,
//! two implementations, and the request/response bodies of the auth
//! endpoints.
//!
//! Token lifecycle:
//! 1. `POST /auth/login` returns a `TokenPair`, both halves are stored
//! 2. Requests read the access token and send it as a bearer header
//! 3. A 401 triggers `POST /auth/refresh-token` with the stored refresh token
//! 4. The new access token (and rotated refresh token) replace the old ones
//! 5. Logout or a failed refresh calls `remove_tokens()`

pub mod constants;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
pub use store::{CredentialStore, StoreFuture};
pub use token::{LoginRequest, LogoutRequest, RefreshRequest, TokenPair};
