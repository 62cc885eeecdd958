//! Session commands over a JSON session file.
//!
//! # Usage
//!
//! ```bash
//! # Log in against the backend configured by EASYHOME_API_URL
//! EASYHOME_PASSWORD=... eh-cli session login -u operator
//!
//! # Use the built-in fixture accounts instead
//! eh-cli session --fixture login -u root -p root-pass
//!
//! # Who is logged in, and may they open a console page?
//! eh-cli session whoami
//! eh-cli session check /admin-manage
//!
//! eh-cli session logout
//! ```
//!
//! The session record survives between invocations in the `--store` file
//! (default `.easyhome-session.json`).

use std::path::PathBuf;
use std::sync::Arc;

use easyhome_admin::config::{AdminConfig, ConfigError};
use easyhome_admin::services::auth::{AuthBackend, AuthError, Credentials};
use easyhome_admin::session::SessionStore;
use easyhome_admin::state::{AppState, StateError};
use easyhome_admin::storage::FileStorage;
use easyhome_core::{Navigation, NavigationTarget};
use thiserror::Error;

/// Environment variable consulted when `--password` is not given.
pub const PASSWORD_ENV: &str = "EASYHOME_PASSWORD";

/// Session store over a JSON file.
pub type CliSession = SessionStore<FileStorage, Arc<AuthBackend>>;

/// Errors that can occur during session commands.
#[derive(Debug, Error)]
pub enum SessionCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    State(#[from] StateError),

    #[error("Login failed: {}", .0.user_message())]
    Auth(#[from] AuthError),

    #[error("No password given; pass --password or set EASYHOME_PASSWORD")]
    MissingPassword,
}

/// Everything a session command needs.
pub struct SessionContext {
    state: AppState,
    store: CliSession,
}

impl SessionContext {
    /// Open the session file at `path`, authenticating with fixture accounts
    /// when `fixture` is set and against the configured backend otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete.
    pub fn open(path: impl Into<PathBuf>, fixture: bool) -> Result<Self, SessionCommandError> {
        let config = if fixture {
            AdminConfig::fixture()
        } else {
            AdminConfig::from_env()?
        };
        let state = AppState::new(config)?;
        let store = SessionStore::new(FileStorage::new(path), Arc::clone(state.auth()));
        Ok(Self { state, store })
    }
}

/// Log in and persist the session.
///
/// # Errors
///
/// Returns an error if no password is available or the login fails.
pub async fn login(
    ctx: &SessionContext,
    username: &str,
    password: Option<String>,
) -> Result<(), SessionCommandError> {
    let password = password
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .ok_or(SessionCommandError::MissingPassword)?;

    let profile = ctx
        .store
        .login(&Credentials::new(username, password))
        .await?;
    tracing::info!(
        "Logged in as {} (id {}, role {})",
        profile.username,
        profile.id,
        profile.role
    );
    Ok(())
}

/// End the persisted session.
pub async fn logout(ctx: &SessionContext) {
    let was_logged_in = ctx.store.restore().await;
    ctx.store.logout().await;
    if was_logged_in {
        tracing::info!("Logged out");
    } else {
        tracing::info!("No active session");
    }
}

/// Show the persisted session.
pub async fn whoami(ctx: &SessionContext) {
    if ctx.store.restore().await {
        let profile = ctx.store.user_info();
        tracing::info!(
            "{} (id {}, role {})",
            profile.username,
            profile.id,
            profile.role
        );
        if let Some(email) = &profile.email {
            tracing::info!("  Email: {email}");
        }
    } else {
        tracing::info!("Not logged in");
    }
}

/// Run the navigation guard for `path` against the persisted session.
pub async fn check(ctx: &SessionContext, path: &str) -> Navigation {
    let target = NavigationTarget::new(path);
    let navigation = ctx.state.guard().check(&ctx.store, &target, None).await;
    match &navigation {
        Navigation::Proceed => tracing::info!("{path}: allowed"),
        Navigation::Redirect(redirect) => {
            tracing::info!("{path}: redirected to {}", redirect.to_uri());
        }
    }
    navigation
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open(dir: &tempfile::TempDir) -> SessionContext {
        SessionContext::open(dir.path().join("session.json"), true).unwrap()
    }

    #[tokio::test]
    async fn test_login_persists_across_invocations() {
        let dir = tempfile::tempdir().unwrap();

        login(&open(&dir), "operator", Some("operator-pass".to_string()))
            .await
            .unwrap();

        let next = open(&dir);
        assert!(next.store.restore().await);
        assert_eq!(next.store.user_info().username, "operator");
        assert_eq!(
            check(&next, "/admin-manage").await,
            Navigation::Redirect(easyhome_core::Redirect::to("/dashboard"))
        );
        assert_eq!(check(&next, "/house-manage").await, Navigation::Proceed);
    }

    #[tokio::test]
    async fn test_logout_clears_file() {
        let dir = tempfile::tempdir().unwrap();
        login(&open(&dir), "root", Some("root-pass".to_string()))
            .await
            .unwrap();

        logout(&open(&dir)).await;

        let next = open(&dir);
        assert!(!next.store.restore().await);
        let navigation = check(&next, "/dashboard").await;
        assert!(matches!(navigation, Navigation::Redirect(r) if r.path == "/login"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = login(&open(&dir), "root", Some("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionCommandError::Auth(AuthError::Rejected(_))));
        assert!(!dir.path().join("session.json").exists());
    }
}
