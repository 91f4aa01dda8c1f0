//! Practice listings

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiClient, Call, RequestOptions, to_json};
use crate::envelope::ApiResponse;
use crate::models::Listing;
use crate::normalize::{IdentifierAlias, Page};
use crate::upload::UploadFile;

pub const LISTINGS_PATH: &str = "/listings";

/// Part name the image endpoint expects.
const IMAGES_FIELD: &str = "images";

/// Filters for `list_listings`. Unset fields are left to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ListingQuery {
    fn to_options(&self) -> RequestOptions {
        let mut options = RequestOptions::new();
        if let Some(page) = self.page {
            options = options.query("page", page);
        }
        if let Some(limit) = self.limit {
            options = options.query("limit", limit);
        }
        if let Some(search) = &self.search {
            options = options.query("search", search);
        }
        if let Some(category) = &self.category {
            options = options.query("category", category);
        }
        options
    }
}

fn listing_path(id: &str) -> String {
    format!("{LISTINGS_PATH}/{}", super::segment(id))
}

impl ApiClient {
    pub async fn list_listings(&self, query: &ListingQuery) -> ApiResponse<Page<Listing>> {
        let call = Call::new(Method::GET, LISTINGS_PATH).options(query.to_options());
        super::page(self.execute(call).await, IdentifierAlias::LISTINGS)
    }

    pub async fn get_listing(&self, id: &str) -> ApiResponse<Listing> {
        let path = listing_path(id);
        let response = self.execute(Call::new(Method::GET, &path)).await;
        super::entity(response, IdentifierAlias::LISTINGS)
    }

    pub async fn create_listing<B: Serialize + ?Sized>(&self, listing: &B) -> ApiResponse<Listing> {
        self.send_listing(Method::POST, LISTINGS_PATH, listing).await
    }

    /// Partial update; only the fields present in `changes` are modified.
    pub async fn update_listing<B: Serialize + ?Sized>(
        &self,
        id: &str,
        changes: &B,
    ) -> ApiResponse<Listing> {
        self.send_listing(Method::PATCH, &listing_path(id), changes)
            .await
    }

    pub async fn delete_listing(&self, id: &str) -> ApiResponse<()> {
        let path = listing_path(id);
        self.execute(Call::new(Method::DELETE, &path))
            .await
            .discard()
    }

    /// Attach images to a listing. `options` carries the progress callback.
    pub async fn upload_listing_images(
        &self,
        id: &str,
        files: Vec<UploadFile>,
        options: RequestOptions,
    ) -> ApiResponse<Listing> {
        let path = format!("{}/images", listing_path(id));
        let response: ApiResponse<Value> = self
            .upload_many(&path, IMAGES_FIELD, files, options)
            .await;
        super::entity(response, IdentifierAlias::LISTINGS)
    }

    async fn send_listing<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResponse<Listing> {
        let body = match to_json(body) {
            Ok(body) => body,
            Err(error) => return ApiResponse::Failure(error),
        };
        let response = self.execute(Call::new(method, path).json(body)).await;
        super::entity(response, IdentifierAlias::LISTINGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::spawn_router;
    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, RawQuery};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use credentials::MemoryCredentialStore;
    use serde_json::json;
    use std::sync::Arc;

    fn client(url: &str) -> ApiClient {
        ApiClient::new(
            ClientConfig::new(url),
            Arc::new(MemoryCredentialStore::with_tokens("A1", "R1")),
        )
        .unwrap()
    }

    fn router() -> Router {
        Router::new()
            .route(
                LISTINGS_PATH,
                get(|RawQuery(query): RawQuery| async move {
                    let entities: Vec<Value> = (0..12)
                        .map(|i| json!({ "_id": format!("l{i}"), "title": "Practice" }))
                        .collect();
                    Json(json!({
                        "success": true,
                        "data": { "entities": entities, "total_count": 12, "query": query }
                    }))
                })
                .post(|Json(body): Json<Value>| async move {
                    let mut listing = body;
                    listing["_id"] = json!("new1");
                    (StatusCode::CREATED, Json(json!({ "success": true, "data": listing })))
                }),
            )
            .route(
                "/listings/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        (
                            StatusCode::NOT_FOUND,
                            Json(json!({
                                "success": false,
                                "error": { "code": "NOT_FOUND", "message": "Listing not found" }
                            })),
                        )
                    } else {
                        (
                            StatusCode::OK,
                            Json(json!({ "success": true, "data": { "_id": id, "price": 1 } })),
                        )
                    }
                })
                .patch(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({ "success": true, "data": { "_id": id, "changes": body } }))
                })
                .delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route(
                "/listings/{id}/images",
                post(|Path(id): Path<String>, body: axum::body::Bytes| async move {
                    let raw = String::from_utf8_lossy(&body).to_string();
                    Json(json!({
                        "success": true,
                        "data": { "_id": id, "image_parts": raw.matches("name=\"images\"").count() }
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn unpaginated_list_becomes_one_page() {
        let url = spawn_router(router()).await;

        let page = client(&url)
            .list_listings(&ListingQuery::default())
            .await
            .into_result()
            .unwrap();

        assert_eq!(page.items.len(), 12);
        assert_eq!((page.total, page.page, page.pages, page.limit), (12, 1, 1, 12));
        assert!(page.items.iter().all(|l| l.id.starts_with('l')));
    }

    #[test]
    fn query_only_carries_set_filters() {
        let options = ListingQuery {
            page: Some(2),
            search: Some("ortho".into()),
            ..Default::default()
        }
        .to_options();
        let debug = format!("{options:?}");
        assert!(debug.contains("(\"page\", \"2\")"));
        assert!(debug.contains("(\"search\", \"ortho\")"));
        assert!(!debug.contains("limit"));
    }

    #[tokio::test]
    async fn get_normalizes_id_and_surfaces_not_found() {
        let url = spawn_router(router()).await;
        let client = client(&url);

        let listing = client.get_listing("abc").await.into_result().unwrap();
        assert_eq!(listing.id, "abc");

        let odd = client.get_listing("a/b?c#d").await.into_result().unwrap();
        assert_eq!(odd.id, "a/b?c#d");

        let err = client.get_listing("missing").await.into_result().unwrap_err();
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.status_code, Some(404));
    }

    #[tokio::test]
    async fn create_update_delete() {
        let url = spawn_router(router()).await;
        let client = client(&url);

        let created = client
            .create_listing(&json!({ "title": "Endodontics" }))
            .await
            .into_result()
            .unwrap();
        assert_eq!(created.id, "new1");
        assert_eq!(created.str_field("title"), Some("Endodontics"));

        let updated = client
            .update_listing("new1", &json!({ "price": 10 }))
            .await
            .into_result()
            .unwrap();
        assert_eq!(updated.get("changes"), Some(&json!({ "price": 10 })));

        assert!(client.delete_listing("new1").await.is_success());
    }

    #[tokio::test]
    async fn images_go_up_as_images_parts() {
        let url = spawn_router(router()).await;
        let last = Arc::new(std::sync::Mutex::new(None));
        let seen = last.clone();

        let listing = client(&url)
            .upload_listing_images(
                "l1",
                vec![
                    UploadFile::new("a.png", vec![1u8; 3]),
                    UploadFile::new("b.png", vec![2u8; 5]),
                ],
                RequestOptions::new().on_progress(move |p| *seen.lock().unwrap() = Some(p)),
            )
            .await
            .into_result()
            .unwrap();

        assert_eq!(listing.id, "l1");
        assert_eq!(listing.get("image_parts"), Some(&json!(2)));
        let last = last.lock().unwrap().unwrap();
        assert_eq!((last.sent, last.total), (8, 8));
    }
}
