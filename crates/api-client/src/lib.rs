//! Authenticated client for the marketplace REST API
//!
//! Every call goes through `ApiClient`, which attaches the stored bearer
//! token, recovers from an expired token by refreshing it at most once per
//! request, and returns an `ApiResponse` envelope no matter how the call
//! ended. Callers never see a transport error type.
//!
//! Request lifecycle:
//! 1. Read the access token from the `CredentialStore` and send the request
//! 2. 2xx → the body already is the envelope, decode and return it
//! 3. 401 → join (or start) the single in-flight refresh, retry once
//! 4. Refresh failed → clear credentials, return the refresh failure
//! 5. Anything else → the server's error code (`API_ERROR` if it sent none),
//!    or `NETWORK_ERROR` when no response arrived
//!
//! Domain endpoints (auth, listings, connections, subscriptions) are thin
//! `impl ApiClient` blocks in `endpoints`, each applying the response
//! normalization its backend family needs.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalize;
mod refresh;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use client::{ApiClient, RequestOptions};
pub use config::ClientConfig;
pub use endpoints::listings::ListingQuery;
pub use envelope::{API_ERROR, ApiError, ApiResponse, CREDENTIAL_ERROR, NETWORK_ERROR};
pub use error::{Error, Result};
pub use models::{Connection, Entity, Listing, Plan, Session, Subscription, User};
pub use normalize::{IdentifierAlias, Page, RawPage};
pub use upload::{ProgressFn, UploadFile, UploadProgress};
