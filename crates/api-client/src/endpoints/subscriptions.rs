//! Subscription plans and the caller's current subscription

use reqwest::Method;

use crate::client::{ApiClient, Call};
use crate::envelope::ApiResponse;
use crate::models::{Plan, Subscription};
use crate::normalize::IdentifierAlias;

pub const PLANS_PATH: &str = "/subscriptions/plans";
pub const CURRENT_SUBSCRIPTION_PATH: &str = "/subscriptions/current";

impl ApiClient {
    pub async fn list_plans(&self) -> ApiResponse<Vec<Plan>> {
        let response = self.execute(Call::new(Method::GET, PLANS_PATH)).await;
        super::entities(response, IdentifierAlias::PLANS)
    }

    /// `None` when the caller has no active subscription.
    pub async fn current_subscription(&self) -> ApiResponse<Option<Subscription>> {
        let response = self
            .execute(Call::new(Method::GET, CURRENT_SUBSCRIPTION_PATH))
            .await;
        super::entity(response, IdentifierAlias::SUBSCRIPTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::spawn_router;
    use axum::Json;
    use axum::Router;
    use axum::routing::get;
    use credentials::MemoryCredentialStore;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn client_with(current: Value) -> ApiClient {
        let app = Router::new()
            .route(
                PLANS_PATH,
                get(|| async {
                    Json(json!({
                        "success": true,
                        "data": [
                            { "plan_id": "basic", "price": 0 },
                            { "plan_id": "pro", "price": 99 }
                        ]
                    }))
                }),
            )
            .route(
                CURRENT_SUBSCRIPTION_PATH,
                get(move || {
                    let current = current.clone();
                    async move { Json(json!({ "success": true, "data": current })) }
                }),
            );
        let url = spawn_router(app).await;
        ApiClient::new(
            ClientConfig::new(url),
            Arc::new(MemoryCredentialStore::with_tokens("A1", "R1")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn plans_are_aliased() {
        let plans = client_with(Value::Null)
            .await
            .list_plans()
            .await
            .into_result()
            .unwrap();
        let ids: Vec<_> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["basic", "pro"]);
    }

    #[tokio::test]
    async fn current_subscription_may_be_absent() {
        let none = client_with(Value::Null)
            .await
            .current_subscription()
            .await
            .into_result()
            .unwrap();
        assert!(none.is_none());

        let some = client_with(json!({ "_id": "s1", "plan": "pro" }))
            .await
            .current_subscription()
            .await
            .into_result()
            .unwrap()
            .unwrap();
        assert_eq!(some.id, "s1");
    }
}
