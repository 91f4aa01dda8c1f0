//! Buyer/seller connection requests on listings

use reqwest::Method;
use serde_json::json;

use crate::client::{ApiClient, Call};
use crate::envelope::ApiResponse;
use crate::models::Connection;
use crate::normalize::{IdentifierAlias, Page};

pub const CONNECTIONS_PATH: &str = "/connections";

impl ApiClient {
    pub async fn list_connections(&self) -> ApiResponse<Page<Connection>> {
        let response = self
            .execute(Call::new(Method::GET, CONNECTIONS_PATH))
            .await;
        super::page(response, IdentifierAlias::CONNECTIONS)
    }

    /// Ask a listing's owner to connect.
    pub async fn request_connection(
        &self,
        listing_id: &str,
        message: Option<&str>,
    ) -> ApiResponse<Connection> {
        let mut body = json!({ "listing_id": listing_id });
        if let Some(message) = message {
            body["message"] = json!(message);
        }
        let response = self
            .execute(Call::new(Method::POST, CONNECTIONS_PATH).json(body))
            .await;
        super::entity(response, IdentifierAlias::CONNECTIONS)
    }

    pub async fn respond_to_connection(&self, id: &str, accept: bool) -> ApiResponse<Connection> {
        let path = format!("{CONNECTIONS_PATH}/{}/respond", super::segment(id));
        let status = if accept { "accepted" } else { "rejected" };
        let body = json!({ "status": status });
        let response = self
            .execute(Call::new(Method::POST, &path).json(body))
            .await;
        super::entity(response, IdentifierAlias::CONNECTIONS)
    }
}
