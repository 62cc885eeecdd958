//! Authentication route handlers for the console.
//!
//! Password login against the configured authenticator, and logout.

use askama::Template;
use axum::{
    Form, Router,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::CurrentSession;
use crate::services::auth::Credentials;
use crate::state::AppState;
use crate::storage::StorageError;

/// Where to go after login when no usable `redirect` was given.
const DEFAULT_AFTER_LOGIN: &str = "/";

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
    username: String,
    redirect: Option<String>,
}

/// Query string of `GET /login`.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    redirect: Option<String>,
}

/// Body of `POST /login`.
#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
    redirect: Option<String>,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

/// Render the login page.
///
/// GET /login
async fn login_page(Query(query): Query<LoginQuery>) -> Result<Html<String>, AppError> {
    let page = LoginTemplate {
        error: None,
        username: String::new(),
        redirect: safe_redirect(query.redirect.as_deref()).map(String::from),
    };
    Ok(Html(page.render()?))
}

/// Verify credentials and start a session.
///
/// POST /login
async fn login(
    CurrentSession(store): CurrentSession,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let redirect = safe_redirect(form.redirect.as_deref()).map(String::from);
    let credentials = Credentials::new(form.username.trim(), form.password);

    match store.login(&credentials).await {
        Ok(profile) => {
            // New session id for the authenticated session; the old one is deleted.
            session.cycle_id().await.map_err(StorageError::from)?;
            set_sentry_user(&profile);
            let target = redirect.as_deref().unwrap_or(DEFAULT_AFTER_LOGIN);
            Ok(Redirect::to(target).into_response())
        }
        Err(e) => {
            let status = if e.is_service_failure() {
                tracing::error!(error = %e, "Login failed");
                StatusCode::BAD_GATEWAY
            } else {
                tracing::warn!(username = %credentials.username, error = %e, "Login refused");
                StatusCode::UNAUTHORIZED
            };
            let page = LoginTemplate {
                error: Some(e.user_message()),
                username: credentials.username,
                redirect,
            };
            Ok((status, Html(page.render()?)).into_response())
        }
    }
}

/// End the session.
///
/// POST /logout
async fn logout(CurrentSession(store): CurrentSession, session: Session) -> impl IntoResponse {
    store.logout().await;
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();
    Redirect::to("/login")
}

/// Accept only same-origin relative paths as post-login destinations.
fn safe_redirect(target: Option<&str>) -> Option<&str> {
    let target = target?.trim();
    let safe = target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(char::is_control);
    safe.then_some(target)
}
