//! EasyHome admin console library.
//!
//! Session store, navigation guard and the console pages, exposed as a
//! library so the CLI and the integration tests can drive them.
//!
//! - [`session::SessionStore`] owns who is logged in.
//! - [`guard::NavigationGuard`] decides every navigation.
//! - [`app`] wires both into an axum router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

use axum::{Router, routing::get};

use crate::middleware::{create_session_layer, navigation_guard};
use crate::state::AppState;

/// Build the console router: guarded pages behind the session layer, plus
/// the unguarded health check.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .merge(routes::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            navigation_guard,
        ))
        .layer(session_layer)
        .route("/health", get(routes::health))
        .with_state(state)
}
