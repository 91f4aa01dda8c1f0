//! The result envelope every client call returns
//!
//! The backend answers `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": { "code", "message" } }`. `ApiResponse` is
//! that shape as an enum, so "exactly one of data/error" holds by
//! construction; it serializes back to the wire shape for callers that
//! hand it on as JSON.

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

/// The server answered with an error (its own code is passed through when
/// the body carries one; this is the fallback).
pub const API_ERROR: &str = "API_ERROR";

/// No interpretable server response: timeout, connection failure, or a
/// request that never left the client.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// Tokens could not be written to or removed from the credential store.
pub const CREDENTIAL_ERROR: &str = "CREDENTIAL_ERROR";

const GENERIC_NETWORK_MESSAGE: &str = "Network request failed";

/// Error half of the envelope. Plain scalars only, so it can be shown,
/// logged, or serialized without holding on to transport state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ApiError {
    pub fn api(code: impl Into<String>, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status_code,
        }
    }

    /// A `NETWORK_ERROR` carrying the transport's diagnostic text.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: NETWORK_ERROR.to_string(),
            message: if message.trim().is_empty() {
                GENERIC_NETWORK_MESSAGE.to_string()
            } else {
                message
            },
            status_code: None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.code == NETWORK_ERROR
    }

    /// Build an error from a non-2xx response body.
    ///
    /// Accepts `{ "error": { "code", "message" } }`, `{ "error": "..." }`
    /// and flat `{ "code", "message" }`. Anything missing falls back to
    /// `API_ERROR` and a message naming the status.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_body(status, &value),
            Err(_) => Self::api(API_ERROR, generic_status_message(status), Some(status)),
        }
    }

    fn from_body(status: u16, body: &Value) -> Self {
        let nested = body.get("error");
        let source = match nested {
            Some(obj) if obj.is_object() => obj,
            _ => body,
        };

        let code = source.get("code").and_then(scalar_text);
        let message = source
            .get("message")
            .and_then(scalar_text)
            .or_else(|| nested.and_then(scalar_text));

        Self {
            code: code.unwrap_or_else(|| API_ERROR.to_string()),
            message: message.unwrap_or_else(|| generic_status_message(status)),
            status_code: Some(status),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Timeout(msg) => ApiError::network(format!("request timed out: {msg}")),
            Error::Http(msg) | Error::InvalidRequest(msg) | Error::Config(msg) => {
                ApiError::network(msg)
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn generic_status_message(status: u16) -> String {
    format!("Request failed with status {status}")
}

/// Uniform outcome of a client call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(ApiError),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Success(data) => Some(data),
            ApiResponse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, ApiError> {
        match self {
            ApiResponse::Success(data) => Ok(data),
            ApiResponse::Failure(error) => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success(data) => ApiResponse::Success(f(data)),
            ApiResponse::Failure(error) => ApiResponse::Failure(error),
        }
    }
}

impl<T> From<std::result::Result<T, ApiError>> for ApiResponse<T> {
    fn from(result: std::result::Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => ApiResponse::Success(data),
            Err(error) => ApiResponse::Failure(error),
        }
    }
}

impl ApiResponse<Value> {
    /// Interpret a raw HTTP response.
    ///
    /// A 2xx body that is an envelope is unwrapped as-is (a `success: false`
    /// body stays a failure). A 2xx body without the envelope shape is taken
    /// as the data itself; an empty body is `null` data.
    pub fn from_http(status: u16, body: &[u8]) -> Self {
        if !(200..300).contains(&status) {
            return ApiResponse::Failure(ApiError::from_response(status, body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return ApiResponse::Success(Value::Null);
        }

        let value: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                return ApiResponse::Failure(ApiError::api(
                    API_ERROR,
                    format!("invalid response body: {e}"),
                    Some(status),
                ));
            }
        };

        match value {
            Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
                if map.get("success") == Some(&Value::Bool(true)) {
                    ApiResponse::Success(map.remove("data").unwrap_or(Value::Null))
                } else {
                    ApiResponse::Failure(ApiError::from_body(status, &Value::Object(map)))
                }
            }
            other => ApiResponse::Success(other),
        }
    }

    /// Deserialize the data into the caller's model. A shape mismatch is an
    /// `API_ERROR`: the server answered, just not with what we expected.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResponse<T> {
        match self {
            ApiResponse::Success(value) => match serde_json::from_value(value) {
                Ok(data) => ApiResponse::Success(data),
                Err(e) => ApiResponse::Failure(ApiError::api(
                    API_ERROR,
                    format!("unexpected response shape: {e}"),
                    None,
                )),
            },
            ApiResponse::Failure(error) => ApiResponse::Failure(error),
        }
    }

    /// Keep only the outcome, for endpoints whose data nobody reads.
    pub fn discard(self) -> ApiResponse<()> {
        self.map(|_| ())
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiResponse", 2)?;
        match self {
            ApiResponse::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ApiResponse::Failure(error) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
