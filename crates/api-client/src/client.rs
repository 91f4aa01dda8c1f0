//! Authenticated request pipeline
//!
//! `ApiClient` sends one logical call as at most two transport attempts:
//! the original, and one retry after a 401 if the token could be refreshed.
//! Every exit path produces an `ApiResponse`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use common::Secret;
use credentials::CredentialStore;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::envelope::{ApiError, ApiResponse};
use crate::error::{Error, Result};
use crate::metrics;
use crate::refresh::TokenRefresher;
use crate::upload::{MultipartBody, ProgressFn, SINGLE_FILE_FIELD, UploadFile, UploadProgress};

/// Retries allowed per call because of a rejected access token.
const MAX_AUTH_RETRIES: u32 = 1;

/// Per-call overrides.
#[derive(Clone, Default)]
pub struct RequestOptions {
    timeout: Option<Duration>,
    query: Vec<(String, String)>,
    progress: Option<ProgressFn>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configured timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Upload progress callback. Ignored by non-upload calls.
    pub fn on_progress(mut self, f: impl Fn(UploadProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("timeout", &self.timeout)
            .field("query", &self.query)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// How a call uses the stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthPolicy {
    /// Bearer token attached; a 401 triggers refresh and one retry
    Renewable,
    /// Bearer token attached; a 401 is returned as-is
    BearerOnly,
    /// No bearer token, no refresh (login)
    Anonymous,
}

#[derive(Debug, Clone)]
enum Payload {
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// One logical call, replayable across attempts.
#[derive(Debug)]
pub(crate) struct Call<'a> {
    method: Method,
    path: &'a str,
    payload: Payload,
    options: RequestOptions,
    auth: AuthPolicy,
}

impl<'a> Call<'a> {
    pub(crate) fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            payload: Payload::Empty,
            options: RequestOptions::default(),
            auth: AuthPolicy::Renewable,
        }
    }

    pub(crate) fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    fn multipart(mut self, body: MultipartBody) -> Self {
        self.payload = Payload::Multipart(body);
        self
    }

    pub(crate) fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn auth(mut self, auth: AuthPolicy) -> Self {
        self.auth = auth;
        self
    }
}

struct RawResponse {
    status: u16,
    body: Bytes,
}

/// Marketplace API client. Cheap to clone; clones share the refresh state,
/// so concurrent 401s across clones still coalesce into one refresh.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<TokenRefresher>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        let refresher = Arc::new(TokenRefresher::new(http.clone(), &config, store.clone()));
        Ok(Self {
            http,
            config: Arc::new(config),
            store,
            refresher,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::POST, path, body).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::PUT, path, body).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.with_body(Method::PATCH, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    /// General form of the verb helpers.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        let mut call = Call::new(method, path).options(options);
        if let Some(body) = body {
            call = call.json(body);
        }
        self.execute(call).await.decode()
    }

    /// Upload one file as the multipart part `file`.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: UploadFile,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        self.upload_many(path, SINGLE_FILE_FIELD, vec![file], options)
            .await
    }

    /// Upload several files, each as a part named `field`.
    pub async fn upload_many<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &str,
        files: Vec<UploadFile>,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        let body = MultipartBody {
            field: field.to_string(),
            files,
        };
        debug!(path, field, files = body.files.len(), bytes = body.total_len(), "uploading");
        let call = Call::new(Method::POST, path)
            .multipart(body)
            .options(options);
        self.execute(call).await.decode()
    }

    async fn with_body<T, B>(&self, method: Method, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match to_json(body) {
            Ok(body) => self.execute(Call::new(method, path).json(body)).await.decode(),
            Err(error) => ApiResponse::Failure(failed(error)),
        }
    }

    /// Run a call to completion: send, refresh and retry once on 401,
    /// convert whatever came back into an envelope.
    #[instrument(
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), method = %call.method, path = call.path)
    )]
    pub(crate) async fn execute(&self, call: Call<'_>) -> ApiResponse<Value> {
        let mut token = match call.auth {
            AuthPolicy::Anonymous => None,
            AuthPolicy::Renewable | AuthPolicy::BearerOnly => self.store.get_token().await,
        };

        for attempt in 0..=MAX_AUTH_RETRIES {
            let started = Instant::now();
            let result = self.send_once(&call, token.as_ref()).await;
            metrics::record_request(
                call.method.as_str(),
                result.as_ref().ok().map(|r| r.status),
                started.elapsed().as_secs_f64(),
            );

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "request failed before a response arrived");
                    return ApiResponse::Failure(failed(e.into()));
                }
            };

            let may_renew = response.status == 401
                && attempt < MAX_AUTH_RETRIES
                && call.auth == AuthPolicy::Renewable;
            if let (true, Some(sent_with)) = (may_renew, token.as_ref()) {
                debug!(attempt, "access token rejected, refreshing");
                match Arc::clone(&self.refresher).token_after_401(sent_with).await {
                    Ok(fresh) => {
                        token = Some(fresh);
                        continue;
                    }
                    Err(error) => return ApiResponse::Failure(failed(error)),
                }
            }

            let envelope = ApiResponse::from_http(response.status, &response.body);
            if let ApiResponse::Failure(error) = &envelope {
                debug!(status = response.status, code = %error.code, "server returned an error");
                metrics::record_error(&error.code);
            }
            return envelope;
        }

        ApiResponse::Failure(failed(ApiError::network("unexpected retry exhaustion")))
    }

    async fn send_once(&self, call: &Call<'_>, token: Option<&Secret<String>>) -> Result<RawResponse> {
        let mut request = self
            .http
            .request(call.method.clone(), self.config.url_for(call.path))
            .timeout(call.options.timeout.unwrap_or(self.config.timeout));

        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        if !call.options.query.is_empty() {
            request = request.query(&call.options.query);
        }
        request = match &call.payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(body),
            Payload::Multipart(body) => {
                request.multipart(body.to_form(call.options.progress.as_ref())?)
            }
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse { status, body })
    }
}

pub(crate) fn to_json<B: Serialize + ?Sized>(body: &B) -> std::result::Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| Error::InvalidRequest(format!("serializing request body: {e}")).into())
}

fn failed(error: ApiError) -> ApiError {
    metrics::record_error(&error.code);
    error
}
