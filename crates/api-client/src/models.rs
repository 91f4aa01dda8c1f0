//! Marketplace entities as the client sees them
//!
//! The backend schema varies per endpoint and changes without notice, so
//! entities keep every field they were sent. Only `id` is lifted out, after
//! identifier normalization has guaranteed it is present.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An entity with a client-side `id` and everything else the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

pub type Listing = Entity;
pub type Connection = Entity;
pub type User = Entity;
pub type Plan = Entity;
pub type Subscription = Entity;

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Session {
    #[serde(default)]
    pub user: Option<User>,
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
