//! Login, logout and the current user

use common::Secret;
use credentials::{LOGIN_PATH, LOGOUT_PATH, LoginRequest, LogoutRequest, TokenPair};
use reqwest::Method;
use tracing::{info, warn};

use crate::client::{ApiClient, AuthPolicy, Call, to_json};
use crate::envelope::{API_ERROR, ApiError, ApiResponse, CREDENTIAL_ERROR};
use crate::models::{Session, User};
use crate::normalize::IdentifierAlias;

pub const ME_PATH: &str = "/users/me";

impl ApiClient {
    /// Exchange credentials for a token pair and store it.
    ///
    /// Sent without a bearer token, so a 401 here (wrong password) is
    /// returned as-is rather than triggering a refresh.
    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<Session> {
        let body = match to_json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }) {
            Ok(body) => body,
            Err(error) => return ApiResponse::Failure(error),
        };
        let call = Call::new(Method::POST, LOGIN_PATH)
            .json(body)
            .auth(AuthPolicy::Anonymous);

        let mut data = match self.execute(call).await.into_result() {
            Ok(data) => data,
            Err(error) => return ApiResponse::Failure(error),
        };
        let tokens: TokenPair = match serde_json::from_value(data.clone()) {
            Ok(tokens) => tokens,
            Err(e) => {
                return ApiResponse::Failure(ApiError::api(
                    API_ERROR,
                    format!("login response carried no tokens: {e}"),
                    None,
                ));
            }
        };
        if Secret::new(tokens.access_token.clone()).is_blank() {
            return ApiResponse::Failure(ApiError::api(
                API_ERROR,
                "login response carried an empty access token",
                None,
            ));
        }

        if let Err(e) = self.credential_store().replace_tokens(tokens).await {
            warn!(error = %e, "could not persist login tokens");
            return ApiResponse::Failure(ApiError::api(CREDENTIAL_ERROR, e.to_string(), None));
        }
        info!("logged in");

        if let Some(user) = data.get_mut("user") {
            IdentifierAlias::USERS.apply(user);
        }
        ApiResponse::Success(data).decode()
    }

    /// End the session. The server call is best-effort; local credentials
    /// are cleared whatever it answers.
    pub async fn logout(&self) -> ApiResponse<()> {
        let store = self.credential_store();
        let body = LogoutRequest {
            refresh_token: store
                .get_refresh_token()
                .await
                .map(|t| t.expose().to_string()),
        };
        let mut call = Call::new(Method::POST, LOGOUT_PATH).auth(AuthPolicy::BearerOnly);
        if let Ok(body) = to_json(&body) {
            call = call.json(body);
        }

        if let ApiResponse::Failure(error) = self.execute(call).await {
            warn!(code = %error.code, "server-side logout failed, clearing local session anyway");
        }

        match store.remove_tokens().await {
            Ok(()) => {
                info!("logged out");
                ApiResponse::Success(())
            }
            Err(e) => ApiResponse::Failure(ApiError::api(CREDENTIAL_ERROR, e.to_string(), None)),
        }
    }

    pub async fn me(&self) -> ApiResponse<User> {
        let response = self.execute(Call::new(Method::GET, ME_PATH)).await;
        super::entity(response, IdentifierAlias::USERS)
    }
}
