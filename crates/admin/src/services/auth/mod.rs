//! Authentication collaborators.
//!
//! The session store never talks to the network itself. It hands credentials
//! to an [`Authenticator`] and receives a bearer token plus the profile of the
//! account, or an [`AuthError`].
//!
//! Two implementations exist:
//! - [`BackendClient`](crate::services::BackendClient) calls the EasyHome
//!   backend over HTTP.
//! - [`FixtureAuthenticator`] checks a fixed list of accounts, for local
//!   development and tests.

mod error;
mod fixture;

pub use error::AuthError;
pub use fixture::{FixtureAccount, FixtureAuthenticator};

use std::future::Future;

use easyhome_core::UserInfo;
use secrecy::SecretString;

use super::backend::BackendClient;

/// Username and password submitted on the login form.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct AuthSuccess {
    /// Bearer token for subsequent API calls.
    pub token: SecretString,
    /// Profile of the authenticated account.
    pub profile: UserInfo,
}

/// Something that can verify credentials and resolve tokens to profiles.
pub trait Authenticator: Send + Sync + 'static {
    /// Verify `credentials` and issue a token.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthSuccess, AuthError>> + Send;

    /// Resolve a previously issued token to the account profile.
    fn fetch_profile(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<UserInfo, AuthError>> + Send;

    /// Invalidate `token`. Best effort; failures are not reported.
    fn revoke(&self, _token: &SecretString) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// The authenticator selected by configuration.
#[derive(Debug)]
pub enum AuthBackend {
    /// The EasyHome backend API.
    Backend(BackendClient),
    /// Fixed fixture accounts.
    Fixture(FixtureAuthenticator),
}

impl AuthBackend {
    /// Number of unread notifications for the account behind `token`.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the backend request fails.
    pub async fn unread_notifications(&self, token: &SecretString) -> Result<u32, AuthError> {
        match self {
            Self::Backend(client) => client.unread_notification_count(token).await,
            Self::Fixture(_) => Ok(0),
        }
    }
}

impl Authenticator for AuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
        match self {
            Self::Backend(client) => client.login(credentials).await,
            Self::Fixture(fixture) => fixture.login(credentials).await,
        }
    }

    async fn fetch_profile(&self, token: &SecretString) -> Result<UserInfo, AuthError> {
        match self {
            Self::Backend(client) => client.fetch_profile(token).await,
            Self::Fixture(fixture) => fixture.fetch_profile(token).await,
        }
    }

    async fn revoke(&self, token: &SecretString) {
        match self {
            Self::Backend(client) => client.revoke(token).await,
            Self::Fixture(fixture) => fixture.revoke(token).await,
        }
    }
}

impl<A: Authenticator> Authenticator for std::sync::Arc<A> {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
        A::login(self, credentials).await
    }

    async fn fetch_profile(&self, token: &SecretString) -> Result<UserInfo, AuthError> {
        A::fetch_profile(self, token).await
    }

    async fn revoke(&self, token: &SecretString) {
        A::revoke(self, token).await;
    }
}
