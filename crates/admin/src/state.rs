//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{AdminConfig, AuthMode};
use crate::guard::NavigationGuard;
use crate::services::auth::{AuthBackend, FixtureAuthenticator};
use crate::services::backend::BackendClient;

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Backend mode requires EASYHOME_API_URL")]
    MissingBackend,
    #[error("Failed to build backend client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    auth: Arc<AuthBackend>,
    guard: NavigationGuard,
}

impl AppState {
    /// Build state from configuration, selecting the authenticator.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if backend mode lacks a URL or the HTTP client
    /// cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, StateError> {
        let auth = match config.auth_mode {
            AuthMode::Backend => {
                let backend = config.backend.as_ref().ok_or(StateError::MissingBackend)?;
                AuthBackend::Backend(BackendClient::new(
                    backend.api_url.clone(),
                    backend.timeout,
                )?)
            }
            AuthMode::Fixture => {
                tracing::warn!("Using fixture accounts; do not run this in production");
                AuthBackend::Fixture(FixtureAuthenticator::demo())
            }
        };
        Ok(Self::with_auth(config, auth))
    }

    /// Build state around an explicit authenticator.
    #[must_use]
    pub fn with_auth(config: AdminConfig, auth: AuthBackend) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                auth: Arc::new(auth),
                guard: NavigationGuard::default(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<AuthBackend> {
        &self.inner.auth
    }

    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.inner.guard
    }
}
