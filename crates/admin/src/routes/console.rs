//! Console page handlers.
//!
//! Each page in the route table renders the shared console layout. The
//! navigation guard has already admitted the visitor by the time a handler
//! runs; the menu only lists pages the guard would admit too.

use askama::Template;
use axum::{
    Router,
    extract::State,
    response::{Html, Redirect},
    routing::get,
};
use easyhome_core::{Navigation, NavigationTarget, SessionState, decide};

use crate::error::AppError;
use crate::guard::{NavigationGuard, find_route};
use crate::middleware::{ConsoleSession, CurrentSession};
use crate::state::AppState;

/// Menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub path: &'static str,
    pub title: &'static str,
}

/// Account shown in the header.
#[derive(Debug, Clone)]
pub struct UserView {
    pub username: String,
    pub role: String,
}

/// Console layout template.
#[derive(Template)]
#[template(path = "console.html")]
pub struct ConsoleTemplate {
    pub title: &'static str,
    pub summary: &'static str,
    pub current_path: String,
    pub user: UserView,
    pub pending_count: u32,
    pub nav: Vec<NavItem>,
}

/// Build the console router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard))
        .route("/admin-manage", get(admin_manage))
        .route("/user-manage", get(user_manage))
        .route("/house-manage", get(house_manage))
}

/// GET /
async fn home() -> Redirect {
    Redirect::to("/dashboard")
}

/// GET /dashboard
async fn dashboard(
    State(state): State<AppState>,
    CurrentSession(store): CurrentSession,
) -> Result<Html<String>, AppError> {
    render_page(
        &state,
        &store,
        "/dashboard",
        "Overview of listings, users and pending notifications.",
    )
    .await
}

/// GET /admin-manage
async fn admin_manage(
    State(state): State<AppState>,
    CurrentSession(store): CurrentSession,
) -> Result<Html<String>, AppError> {
    render_page(
        &state,
        &store,
        "/admin-manage",
        "Console administrator accounts.",
    )
    .await
}

/// GET /user-manage
async fn user_manage(
    State(state): State<AppState>,
    CurrentSession(store): CurrentSession,
) -> Result<Html<String>, AppError> {
    render_page(
        &state,
        &store,
        "/user-manage",
        "Registered users of the listing site.",
    )
    .await
}

/// GET /house-manage
async fn house_manage(
    State(state): State<AppState>,
    CurrentSession(store): CurrentSession,
) -> Result<Html<String>, AppError> {
    render_page(
        &state,
        &store,
        "/house-manage",
        "Property listings awaiting review.",
    )
    .await
}

/// Refresh the unread-notification count, then render `path`.
async fn render_page(
    state: &AppState,
    store: &ConsoleSession,
    path: &'static str,
    summary: &'static str,
) -> Result<Html<String>, AppError> {
    refresh_pending_count(state, store).await;

    let route = find_route(state.guard().routes(), path)
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;
    let snapshot = store.snapshot();
    let profile = snapshot.user_info();

    let page = ConsoleTemplate {
        title: route.title,
        summary,
        current_path: path.to_string(),
        user: UserView {
            username: profile.username.clone(),
            role: profile.role.to_string(),
        },
        pending_count: snapshot.pending_count(),
        nav: menu(state.guard(), &snapshot),
    };
    Ok(Html(page.render()?))
}

async fn refresh_pending_count(state: &AppState, store: &ConsoleSession) {
    let Some(token) = store.bearer_token() else {
        return;
    };
    match state.auth().unread_notifications(&token).await {
        Ok(count) => {
            store.set_pending_count(count);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to refresh unread notifications"),
    }
}

/// Pages the guard would let `state` enter, excluding login and home.
fn menu(guard: &NavigationGuard, state: &SessionState) -> Vec<NavItem> {
    let paths = guard.paths();
    guard
        .routes()
        .iter()
        .filter(|r| r.path != paths.login && r.path != paths.root)
        .filter(|r| {
            decide(
                &r.requirement,
                &NavigationTarget::new(r.path),
                state,
                guard.paths(),
            ) == Navigation::Proceed
        })
        .map(|r| NavItem {
            path: r.path,
            title: r.title,
        })
        .collect()
}
