//! Fixture-account authenticator for local development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use easyhome_core::{AccountStatus, AdminRole, Email, UserId, UserInfo};
use secrecy::{ExposeSecret, SecretString};

use super::{AuthError, AuthSuccess, Authenticator, Credentials};

/// A known account accepted by [`FixtureAuthenticator`].
#[derive(Debug, Clone)]
pub struct FixtureAccount {
    pub password: SecretString,
    pub profile: UserInfo,
}

impl FixtureAccount {
    #[must_use]
    pub fn new(profile: UserInfo, password: impl Into<String>) -> Self {
        Self {
            password: SecretString::from(password.into()),
            profile,
        }
    }
}

/// Accepts only a fixed set of accounts and issues random tokens for them.
///
/// Issued tokens live in memory, so they stop resolving when the process
/// exits.
#[derive(Debug, Default)]
pub struct FixtureAuthenticator {
    accounts: Vec<FixtureAccount>,
    issued: Mutex<HashMap<String, UserInfo>>,
}

impl FixtureAuthenticator {
    #[must_use]
    pub fn new(accounts: Vec<FixtureAccount>) -> Self {
        Self {
            accounts,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// The development accounts: `root` (super admin) and `operator` (admin).
    #[must_use]
    pub fn demo() -> Self {
        Self::new(vec![
            FixtureAccount::new(
                UserInfo {
                    id: UserId::new(1),
                    username: "root".to_string(),
                    role: AdminRole::SuperAdmin,
                    status: AccountStatus::Active,
                    email: Email::parse("root@easyhome.local").ok(),
                },
                "root-pass",
            ),
            FixtureAccount::new(
                UserInfo {
                    id: UserId::new(2),
                    username: "operator".to_string(),
                    role: AdminRole::Admin,
                    status: AccountStatus::Active,
                    email: Email::parse("operator@easyhome.local").ok(),
                },
                "operator-pass",
            ),
        ])
    }

    /// Resolve an issued token without going through the trait.
    #[must_use]
    pub fn profile_for(&self, token: &str) -> Option<UserInfo> {
        self.issued().get(token).cloned()
    }

    /// Number of tokens that currently resolve.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued().len()
    }

    fn issued(&self) -> MutexGuard<'_, HashMap<String, UserInfo>> {
        self.issued.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Authenticator for FixtureAuthenticator {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
        let account = self
            .accounts
            .iter()
            .find(|a| {
                a.profile.username == credentials.username
                    && a.password.expose_secret() == credentials.password.expose_secret()
            })
            .ok_or_else(|| {
                AuthError::Rejected("Invalid username or password.".to_string())
            })?;

        let token = format!("fixture-{:032x}", rand::random::<u128>());
        self.issued().insert(token.clone(), account.profile.clone());

        Ok(AuthSuccess {
            token: SecretString::from(token),
            profile: account.profile.clone(),
        })
    }

    async fn fetch_profile(&self, token: &SecretString) -> Result<UserInfo, AuthError> {
        self.profile_for(token.expose_secret())
            .ok_or_else(|| {
                AuthError::Rejected("Session expired, please log in again.".to_string())
            })
    }

    async fn revoke(&self, token: &SecretString) {
        self.issued().remove(token.expose_secret());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_account_logs_in() {
        let auth = FixtureAuthenticator::demo();
        let success = auth
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap();
        assert_eq!(success.profile.role, AdminRole::Admin);
        assert!(success.token.expose_secret().starts_with("fixture-"));

        let profile = auth.fetch_profile(&success.token).await.unwrap();
        assert_eq!(profile, success.profile);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let auth = FixtureAuthenticator::demo();
        let err = auth
            .login(&Credentials::new("root", "operator-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_revoked_token_no_longer_resolves() {
        let auth = FixtureAuthenticator::demo();
        let success = auth
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap();
        auth.revoke(&success.token).await;
        assert!(auth.fetch_profile(&success.token).await.is_err());
    }
}
