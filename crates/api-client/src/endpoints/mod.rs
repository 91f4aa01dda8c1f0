//! Typed marketplace endpoints on top of the request pipeline.
//!
//! Each family normalizes identifiers with its `IdentifierAlias` before the
//! payload is decoded, and list endpoints go through `RawPage` so callers
//! always get a `Page`.

pub mod auth;
pub mod connections;
pub mod listings;
pub mod subscriptions;

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::ApiResponse;
use crate::normalize::{IdentifierAlias, Page, RawPage};

/// Percent-encode a caller-supplied id for use as one path segment.
pub(crate) fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// Normalize the identifier of a single entity, then decode it. Nested
/// values are never touched.
pub(crate) fn entity<T: DeserializeOwned>(
    response: ApiResponse<Value>,
    alias: IdentifierAlias,
) -> ApiResponse<T> {
    response
        .map(|mut data| {
            alias.apply(&mut data);
            data
        })
        .decode()
}

/// Normalize every entity of a list response, then decode it.
pub(crate) fn entities<T: DeserializeOwned>(
    response: ApiResponse<Value>,
    alias: IdentifierAlias,
) -> ApiResponse<T> {
    response
        .map(|mut data| {
            alias.apply_list(&mut data);
            data
        })
        .decode()
}

/// Normalize identifiers, then decode either list shape into a `Page`.
pub(crate) fn page<T: DeserializeOwned>(
    response: ApiResponse<Value>,
    alias: IdentifierAlias,
) -> ApiResponse<Page<T>> {
    entities::<RawPage<T>>(response, alias).map(Page::from)
}
