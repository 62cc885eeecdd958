//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check (no session required)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Verify credentials
//! POST /logout                 - Logout
//!
//! # Console (access per route table, see `guard::CONSOLE_ROUTES`)
//! GET  /                       - Redirects to /dashboard
//! GET  /dashboard              - Overview
//! GET  /admin-manage           - Administrators (super admin only)
//! GET  /user-manage            - Users
//! GET  /house-manage           - Listings
//! ```

pub mod auth;
pub mod console;

use axum::Router;

use crate::state::AppState;

/// All guarded console routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(auth::router()).merge(console::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}
