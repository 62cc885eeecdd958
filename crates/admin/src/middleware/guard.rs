//! Navigation guard middleware.
//!
//! Every request gets a [`ConsoleSession`] over its browser session, inserted
//! into the request extensions. `GET` and `HEAD` requests are navigations and
//! pass through the [`NavigationGuard`](crate::guard::NavigationGuard) first;
//! a redirect decision short-circuits with `303 See Other`.
//!
//! The store lives for one request. Its generation counter orders a restore
//! against a login or logout made through the same handle, so it covers the
//! guard's restore and the handler that follows. Concurrent requests from the
//! same browser each hold their own store and are ordered only by the
//! tower-sessions record they share.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header::REFERER},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use easyhome_core::{Navigation, NavigationTarget};
use tower_sessions::Session;
use url::Url;

use crate::services::auth::AuthBackend;
use crate::session::SessionStore;
use crate::state::AppState;

/// The session store used by the console: browser session storage plus the
/// configured authenticator.
pub type ConsoleSession = SessionStore<Session, Arc<AuthBackend>>;

/// Build the request's session store and run the guard for navigations.
pub async fn navigation_guard(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let store = ConsoleSession::new(session, Arc::clone(state.auth()));

    if matches!(*request.method(), Method::GET | Method::HEAD) {
        let uri = request.uri();
        let target = NavigationTarget::new(
            uri.path_and_query()
                .map_or_else(|| uri.path(), |pq| pq.as_str()),
        );
        let from = referer_target(request.headers());

        if let Navigation::Redirect(redirect) =
            state.guard().check(&store, &target, from.as_ref()).await
        {
            return Redirect::to(&redirect.to_uri()).into_response();
        }
    } else {
        store.restore().await;
    }

    request.extensions_mut().insert(store);
    next.run(request).await
}

/// The page the visitor came from, if the browser said so.
fn referer_target(headers: &HeaderMap) -> Option<NavigationTarget> {
    let referer = headers.get(REFERER)?.to_str().ok()?;
    let url = Url::parse(referer).ok()?;
    let full_path = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    Some(NavigationTarget::new(&full_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_referer_target() {
        let mut headers = HeaderMap::new();
        assert!(referer_target(&headers).is_none());

        headers.insert(
            REFERER,
            HeaderValue::from_static("http://localhost:3001/house-manage?page=3"),
        );
        let from = referer_target(&headers).unwrap();
        assert_eq!(from.path, "/house-manage");
        assert_eq!(from.full_path, "/house-manage?page=3");
    }
}
