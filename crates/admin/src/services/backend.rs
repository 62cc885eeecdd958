//! HTTP client for the EasyHome backend API.
//!
//! Every endpoint answers with the same envelope:
//!
//! ```json
//! { "code": "SUCCESS", "message": "...", "data": ... }
//! ```
//!
//! Anything other than `code == "SUCCESS"` is a refusal. HTTP 401/403 are
//! refusals too; other non-2xx statuses are server errors.

use std::time::Duration;

use easyhome_core::UserInfo;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::auth::{AuthError, AuthSuccess, Authenticator, Credentials};

/// Envelope code signalling success.
const SUCCESS_CODE: &str = "SUCCESS";

const LOGIN_PATH: &str = "api/admin/login";
const LOGOUT_PATH: &str = "api/admin/logout";
const USER_INFO_PATH: &str = "api/admin/user-info";
const UNREAD_NOTIFICATIONS_PATH: &str = "api/notification/unread";

/// Request body for `POST /api/admin/login`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response envelope shared by all backend endpoints.
#[derive(Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Client for the EasyHome backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| {
                AuthError::InvalidProfile(format!("bad endpoint {path}: {e}"))
            })
    }

    /// Number of unread notifications for the account behind `token`.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the request fails or is refused.
    #[instrument(skip_all)]
    pub async fn unread_notification_count(&self, token: &SecretString) -> Result<u32, AuthError> {
        let response = self
            .http
            .get(self.endpoint(UNREAD_NOTIFICATIONS_PATH)?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        let items: Vec<serde_json::Value> = read_envelope(response).await?;
        Ok(u32::try_from(items.len()).unwrap_or(u32::MAX))
    }
}

impl Authenticator for BackendClient {
    #[instrument(skip_all, fields(username = %credentials.username))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
        let response = self
            .http
            .post(self.endpoint(LOGIN_PATH)?)
            .json(&LoginRequest {
                username: &credentials.username,
                password: credentials.password.expose_secret(),
            })
            .send()
            .await?;

        let token: String = read_envelope(response).await?;
        if token.is_empty() {
            return Err(AuthError::InvalidProfile(
                "login returned an empty token".to_string(),
            ));
        }
        let token = SecretString::from(token);
        let profile = self.fetch_profile(&token).await?;

        Ok(AuthSuccess { token, profile })
    }

    #[instrument(skip_all)]
    async fn fetch_profile(&self, token: &SecretString) -> Result<UserInfo, AuthError> {
        let response = self
            .http
            .get(self.endpoint(USER_INFO_PATH)?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        read_envelope(response).await
    }

    #[instrument(skip_all)]
    async fn revoke(&self, token: &SecretString) {
        let Ok(url) = self.endpoint(LOGOUT_PATH) else {
            return;
        };
        let result = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        if let Err(e) = result {
            tracing::debug!(error = %e, "Backend logout failed");
        }
    }
}

/// Unwrap the response envelope, mapping refusals and failures to `AuthError`.
async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = response
            .json::<Envelope<serde_json::Value>>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_default();
        return Err(AuthError::Rejected(message));
    }

    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AuthError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: Envelope<T> = response.json().await?;
    if envelope.code != SUCCESS_CODE {
        return Err(AuthError::Rejected(envelope.message.unwrap_or_default()));
    }
    envelope
        .data
        .ok_or_else(|| {
            AuthError::InvalidProfile("response carried no data".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use easyhome_core::{AdminRole, UserId};
    use serde_json::{Value, json};

    const GOOD_TOKEN: &str = "tok-123";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
    }

    async fn login(Json(body): Json<Value>) -> Json<Value> {
        if body["username"] == "lima" && body["password"] == "secret-pw" {
            Json(json!({ "code": "SUCCESS", "data": GOOD_TOKEN }))
        } else {
            Json(json!({ "code": "UNAUTHORIZED", "message": "Wrong username or password" }))
        }
    }

    async fn user_info(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if authorized(&headers) {
            (
                StatusCode::OK,
                Json(json!({
                    "code": "SUCCESS",
                    "data": {
                        "id": 4,
                        "username": "lima",
                        "role": "super_admin",
                        "status": "active"
                    }
                })),
            )
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "code": "UNAUTHORIZED", "message": "Please log in" })),
            )
        }
    }

    async fn unread(headers: HeaderMap) -> Json<Value> {
        if authorized(&headers) {
            Json(json!({ "code": "SUCCESS", "data": [{ "id": 1 }, { "id": 2 }] }))
        } else {
            Json(json!({ "code": "UNAUTHORIZED" }))
        }
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "database down")
    }

    /// Serve a fake backend on an ephemeral port and return a client for it.
    async fn fake_backend(broken_profile: bool) -> BackendClient {
        let mut app = Router::new()
            .route("/api/admin/login", post(login))
            .route("/api/notification/unread", get(unread));
        app = if broken_profile {
            app.route("/api/admin/user-info", get(broken))
        } else {
            app.route("/api/admin/user-info", get(user_info))
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        BackendClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_login_fetches_profile() {
        let client = fake_backend(false).await;
        let success = client
            .login(&Credentials::new("lima", "secret-pw"))
            .await
            .unwrap();
        assert_eq!(success.token.expose_secret(), GOOD_TOKEN);
        assert_eq!(success.profile.id, UserId::new(4));
        assert_eq!(success.profile.role, AdminRole::SuperAdmin);
    }

    #[tokio::test]
    async fn test_refused_login_carries_backend_message() {
        let client = fake_backend(false).await;
        let err = client
            .login(&Credentials::new("lima", "nope"))
            .await
            .unwrap_err();
        match err {
            AuthError::Rejected(message) => assert_eq!(message, "Wrong username or password"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_profile_fetch_is_rejected() {
        let client = fake_backend(false).await;
        let err = client
            .fetch_profile(&SecretString::from("stale"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_distinguished() {
        let client = fake_backend(true).await;
        let err = client
            .fetch_profile(&SecretString::from(GOOD_TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Server { status: 500, .. }));
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn test_unread_notification_count() {
        let client = fake_backend(false).await;
        let count = client
            .unread_notification_count(&SecretString::from(GOOD_TOKEN))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = BackendClient::new(
            Url::parse("http://backend.internal:8080/easyhome").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(LOGIN_PATH).unwrap().as_str(),
            "http://backend.internal:8080/easyhome/api/admin/login"
        );
    }
}
