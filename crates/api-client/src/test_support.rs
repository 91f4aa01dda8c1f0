//! Mock marketplace backend for tests
//!
//! Serves `/protected` (accepts one bearer token, 401 otherwise) and
//! `/auth/refresh-token` (configurable answer and delay) on a random local
//! port, counting calls so tests can assert on refresh fan-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{any, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone)]
enum RefreshKind {
    Issue {
        access: String,
        refresh: Option<String>,
    },
    Reject,
    Hang,
}

/// How the mock refresh endpoint answers.
#[derive(Clone)]
pub(crate) struct RefreshBehavior {
    kind: RefreshKind,
    delay: Duration,
}

impl RefreshBehavior {
    pub(crate) fn issue(access: &str, refresh: Option<&str>) -> Self {
        Self {
            kind: RefreshKind::Issue {
                access: access.to_string(),
                refresh: refresh.map(str::to_string),
            },
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn reject() -> Self {
        Self {
            kind: RefreshKind::Reject,
            delay: Duration::ZERO,
        }
    }

    /// Never answers within any test timeout.
    pub(crate) fn hang() -> Self {
        Self {
            kind: RefreshKind::Hang,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub(crate) struct MockBackend {
    valid_token: String,
    refresh: RefreshBehavior,
    pub protected_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    last_refresh: std::sync::Mutex<Option<String>>,
    seen_auth: std::sync::Mutex<Vec<Option<String>>>,
}

impl MockBackend {
    pub(crate) fn new(valid_token: &str, refresh: RefreshBehavior) -> Arc<Self> {
        Arc::new(Self {
            valid_token: valid_token.to_string(),
            refresh,
            protected_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            last_refresh: std::sync::Mutex::new(None),
            seen_auth: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh.lock().unwrap().clone()
    }

    /// Authorization headers seen by `/protected`, in arrival order.
    pub(crate) fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }
}

async fn protected(
    State(backend): State<Arc<MockBackend>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    backend.protected_calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.seen_auth.lock().unwrap().push(auth.clone());

    if auth.as_deref() == Some(format!("Bearer {}", backend.valid_token).as_str()) {
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "ok": true, "method": method.as_str(), "body": body }
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": { "code": "TOKEN_EXPIRED", "message": "jwt expired" }
            })),
        )
    }
}

async fn refresh(
    State(backend): State<Arc<MockBackend>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    *backend.last_refresh.lock().unwrap() = body["refresh_token"].as_str().map(str::to_string);

    tokio::time::sleep(backend.refresh.delay).await;
    match &backend.refresh.kind {
        RefreshKind::Issue { access, refresh } => {
            let mut data = json!({ "access_token": access });
            if let Some(refresh) = refresh {
                data["refresh_token"] = json!(refresh);
            }
            (StatusCode::OK, Json(json!({ "success": true, "data": data })))
        }
        RefreshKind::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": { "code": "REFRESH_TOKEN_INVALID", "message": "Refresh token expired" }
            })),
        ),
        RefreshKind::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            (StatusCode::GATEWAY_TIMEOUT, Json(Value::Null))
        }
    }
}

pub(crate) fn backend_router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/protected", any(protected))
        .route("/auth/refresh-token", post(refresh))
        .with_state(backend)
}

/// Serve `app` on a random local port and return its base URL.
pub(crate) async fn spawn_router(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    url
}

pub(crate) async fn spawn_backend(backend: Arc<MockBackend>) -> String {
    spawn_router(backend_router(backend)).await
}
