//! Response normalization at the client boundary
//!
//! The backend is inconsistent about two things, and both are fixed here
//! once, right after a successful envelope arrives:
//!
//! - Entity identifiers. Some families key entities by a backend-specific
//!   field (`_id`, `connection_id`, `plan_id`) while the client model reads
//!   `id`. `IdentifierAlias` fills the client field from the backend one.
//! - Pagination. Some list endpoints answer `{ entities, total_count }`
//!   instead of the paged `{ items, total, page, pages, limit }`. `RawPage`
//!   accepts either and converts into `Page`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const ENTITIES_KEY: &str = "entities";
const ITEMS_KEY: &str = "items";

/// Fields that, next to `items`, mark the paged list shape.
const PAGE_FIELDS: &[&str] = &["total", "page", "pages", "limit"];

/// Identifier rename for one endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierAlias {
    /// Field the backend fills
    pub backend: &'static str,
    /// Field the client model reads
    pub client: &'static str,
}

impl IdentifierAlias {
    pub const LISTINGS: Self = Self::to_id("_id");
    pub const USERS: Self = Self::to_id("_id");
    pub const CONNECTIONS: Self = Self::to_id("connection_id");
    pub const PLANS: Self = Self::to_id("plan_id");
    pub const SUBSCRIPTIONS: Self = Self::to_id("_id");

    const fn to_id(backend: &'static str) -> Self {
        Self {
            backend,
            client: "id",
        }
    }

    /// Copy the backend identifier into the client field when the client
    /// field is missing or null. Leaves every other field alone, so applying
    /// it twice is the same as applying it once.
    pub fn apply(&self, entity: &mut Value) {
        let Value::Object(map) = entity else {
            return;
        };
        if map.get(self.client).is_some_and(|v| !v.is_null()) {
            return;
        }
        if let Some(id) = map.get(self.backend).filter(|v| !v.is_null()).cloned() {
            map.insert(self.client.to_string(), id);
        }
    }

    /// Apply to every entity of a list response: a bare array, or a list
    /// wrapper shaped like `RawPage` (an `entities` array, or an `items`
    /// array with full paging fields). Anything else is left alone, so a
    /// single entity that happens to carry an `items` field is untouched.
    pub fn apply_list(&self, data: &mut Value) {
        if let Some(entities) = list_entries(data) {
            entities.iter_mut().for_each(|e| self.apply(e));
        }
    }
}

fn list_entries(data: &mut Value) -> Option<&mut Vec<Value>> {
    match data {
        Value::Array(entities) => Some(entities),
        Value::Object(map) => {
            let key = if map.get(ENTITIES_KEY).is_some_and(Value::is_array) {
                ENTITIES_KEY
            } else if map.get(ITEMS_KEY).is_some_and(Value::is_array)
                && PAGE_FIELDS.iter().all(|f| map.contains_key(*f))
            {
                ITEMS_KEY
            } else {
                return None;
            };
            map.get_mut(key).and_then(Value::as_array_mut)
        }
        _ => None,
    }
}

/// Client paging model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub limit: u32,
}

/// Either list shape the backend produces.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPage<T> {
    Paged(Page<T>),
    Entities {
        entities: Vec<T>,
        #[serde(default)]
        total_count: Option<u64>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        pages: Option<u32>,
        #[serde(default)]
        limit: Option<u32>,
    },
}

impl<T> From<RawPage<T>> for Page<T> {
    /// Unpaginated endpoints map to a single page: `page` and `pages`
    /// default to 1, `limit` to the number of entities returned, `total`
    /// to the same count when `total_count` is missing. When a limit is
    /// known but `pages` is not, `pages` is `ceil(total / limit)`.
    fn from(raw: RawPage<T>) -> Self {
        match raw {
            RawPage::Paged(page) => page,
            RawPage::Entities {
                entities,
                total_count,
                page,
                pages,
                limit,
            } => {
                let count = u32::try_from(entities.len()).unwrap_or(u32::MAX);
                let total = total_count.unwrap_or(u64::from(count));
                let limit = limit.unwrap_or(count);
                let pages = pages.unwrap_or_else(|| {
                    if limit == 0 {
                        1
                    } else {
                        u32::try_from(total.div_ceil(u64::from(limit)))
                            .unwrap_or(u32::MAX)
                            .max(1)
                    }
                });
                Page {
                    items: entities,
                    total,
                    page: page.unwrap_or(1),
                    pages,
                    limit,
                }
            }
        }
    }
}
