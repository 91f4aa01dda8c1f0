//! Single-flight access token refresh
//!
//! When a request comes back 401, its caller asks the refresher for a new
//! access token. At most one refresh call is outstanding at a time:
//!
//! - `Idle` → the caller becomes the leader. The refresh runs on a spawned
//!   task so it settles even if the leader's future is dropped.
//! - `Refreshing(waiters)` → the caller parks a oneshot sender in the queue
//!   and awaits it.
//!
//! When the refresh settles the state returns to `Idle` and every waiter is
//! sent the same outcome, in the order they queued. A failed refresh clears
//! the stored credentials.
//!
//! Writes are guarded against a concurrent login: the result of a refresh
//! is only persisted (and a failure only clears the store) if the stored
//! refresh token is still the one the refresh was issued with. The check
//! and the write are one conditional store operation, so a login can never
//! be split into a mismatched pair.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use credentials::{CredentialStore, REFRESH_PATH, RefreshRequest, TokenPair};
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::envelope::{API_ERROR, ApiError, ApiResponse};
use crate::error::Error;
use crate::metrics;

/// What every party to one refresh receives: the new access token, or the
/// failure to hand back to the caller.
pub(crate) type RefreshOutcome = std::result::Result<Secret<String>, ApiError>;

/// Refresh state machine.
enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

pub(crate) struct TokenRefresher {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    store: Arc<dyn CredentialStore>,
    state: Mutex<RefreshState>,
}

impl TokenRefresher {
    pub(crate) fn new(
        http: reqwest::Client,
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            url: config.url_for(REFRESH_PATH),
            timeout: config.timeout,
            store,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Obtain a usable access token after a request sent with `sent_with`
    /// was rejected.
    ///
    /// If another refresh already replaced `sent_with` in the store, that
    /// token is returned without a new refresh call.
    pub(crate) async fn token_after_401(self: Arc<Self>, sent_with: &Secret<String>) -> RefreshOutcome {
        let mut state = self.state.lock().await;

        if let RefreshState::Refreshing { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(position = waiters.len(), "refresh in flight, queued as waiter");
            drop(state);
            return rx
                .await
                .unwrap_or_else(|_| Err(ApiError::network("token refresh was abandoned")));
        }

        if let Some(current) = self.store.get_token().await {
            if current != *sent_with {
                debug!("access token already replaced, retrying without refresh");
                return Ok(current);
            }
        }

        *state = RefreshState::Refreshing {
            waiters: Vec::new(),
        };
        drop(state);

        let refresher = Arc::clone(&self);
        let task = tokio::spawn(async move {
            let outcome = refresher.run().await;
            refresher.settle(&outcome).await;
            outcome
        });

        task.await
            .unwrap_or_else(|e| Err(ApiError::network(format!("token refresh task failed: {e}"))))
    }

    /// Return to `Idle` and fan the outcome out to the queued waiters.
    async fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "refresh settled, releasing waiters"
        );
        for waiter in waiters {
            // A waiter whose caller went away is skipped
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn run(&self) -> RefreshOutcome {
        let Some(refresh) = self.store.get_refresh_token().await else {
            warn!("no refresh token stored, clearing session");
            self.clear_credentials(None).await;
            metrics::record_refresh("failure");
            return Err(session_expired());
        };

        let result = self.request(&refresh).await.and_then(|pair| {
            if Secret::new(pair.access_token.clone()).is_blank() {
                Err(ApiError::api(API_ERROR, "refresh response carried an empty access token", None))
            } else {
                Ok(pair)
            }
        });

        match result {
            Ok(pair) => {
                let access = Secret::new(pair.access_token.clone());
                match self.store.store_pair_if(refresh, pair).await {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("credentials replaced during refresh, discarding refreshed token");
                        metrics::record_refresh("superseded");
                        return self.store.get_token().await.ok_or_else(session_expired);
                    }
                    Err(e) => warn!(error = %e, "failed to persist refreshed token"),
                }
                info!("access token refreshed");
                metrics::record_refresh("success");
                Ok(access)
            }
            Err(error) => {
                warn!(code = %error.code, message = %error.message, "token refresh failed, clearing session");
                self.clear_credentials(Some(refresh)).await;
                metrics::record_refresh("failure");
                Err(error)
            }
        }
    }

    /// `POST /auth/refresh-token`, sent without a bearer header.
    async fn request(&self, refresh: &Secret<String>) -> std::result::Result<TokenPair, ApiError> {
        let body = RefreshRequest {
            refresh_token: refresh.expose().clone(),
        };
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::from(Error::from(e)))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from(Error::from(e)))?;

        ApiResponse::<Value>::from_http(status, &bytes)
            .decode::<TokenPair>()
            .into_result()
    }

    /// Clear the store unless a login replaced the refresh token this
    /// refresh was working from.
    async fn clear_credentials(&self, used: Option<Secret<String>>) {
        match self.store.remove_tokens_if(used).await {
            Ok(true) => {}
            Ok(false) => info!("credentials replaced during refresh, keeping them"),
            Err(e) => warn!(error = %e, "failed to clear credentials"),
        }
    }
}

fn session_expired() -> ApiError {
    ApiError::api(API_ERROR, "Session expired, please log in again", Some(401))
}
