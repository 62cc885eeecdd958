//! Extractor for the request's session store.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::guard::ConsoleSession;
use crate::error::AppError;

/// The [`ConsoleSession`] inserted by the navigation guard middleware.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(store): CurrentSession) -> impl IntoResponse {
///     format!("Hello, {}!", store.user_info().username)
/// }
/// ```
pub struct CurrentSession(pub ConsoleSession);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ConsoleSession>()
            .cloned()
            .map(Self)
            .ok_or_else(|| {
                AppError::Internal("navigation guard middleware not installed".to_string())
            })
    }
}
