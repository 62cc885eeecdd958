//! The session store: the single authority on who is logged in.
//!
//! A [`SessionStore`] owns the in-memory [`SessionState`] and the persisted
//! session record behind a [`KeyValueStorage`]. Clones share the same state,
//! so the navigation guard and the views holding a handle always agree.
//!
//! # Persisted record
//!
//! - `admin_token` - bearer token; its presence means "logged in"
//! - `admin_user_info` - JSON of the cached [`UserInfo`]
//!
//! # Stale restores
//!
//! `restore()` suspends while it reads storage or fetches a profile. `login()`
//! and `logout()` bump a generation counter; a restore that finishes after
//! the counter moved discards its result instead of overwriting the newer
//! state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use easyhome_core::{AccountStatus, SessionState, UserInfo};
use secrecy::SecretString;

use crate::services::auth::{AuthError, Authenticator, Credentials};
use crate::storage::{KeyValueStorage, keys};

/// What the persisted record says, before it is applied.
enum Persisted {
    /// No usable record.
    Empty,
    /// Token and profile, ready to apply.
    Session { token: SecretString, profile: UserInfo },
    /// The record is damaged or the token no longer resolves; wipe it.
    Invalid,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    token: Option<SecretString>,
    generation: u64,
}

struct Shared<S, A> {
    storage: S,
    auth: A,
    inner: Mutex<Inner>,
}

/// Shared handle to one console session.
pub struct SessionStore<S, A> {
    shared: Arc<Shared<S, A>>,
}

impl<S, A> Clone for SessionStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, A> std::fmt::Debug for SessionStore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionStore")
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

impl<S, A> SessionStore<S, A> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock().state.is_logged_in()
    }

    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        self.lock().state.user_info().clone()
    }

    #[must_use]
    pub fn pending_count(&self) -> u32 {
        self.lock().state.pending_count()
    }

    /// Bearer token for authenticated API calls, if logged in.
    #[must_use]
    pub fn bearer_token(&self) -> Option<SecretString> {
        self.lock().token.clone()
    }

    /// Replace the profile of the logged-in account. In-memory only.
    ///
    /// Returns `false` (and changes nothing) when logged out or when `info`
    /// has no assigned ID.
    pub fn set_profile(&self, info: UserInfo) -> bool {
        self.lock().state.set_profile(info)
    }

    /// Update the pending-notification counter. In-memory only.
    ///
    /// Returns `false` (and changes nothing) when logged out.
    pub fn set_pending_count(&self, count: u32) -> bool {
        self.lock().state.set_pending_count(count)
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Replace state and token and start a new generation.
    fn install(&self, state: SessionState, token: Option<SecretString>) {
        let mut inner = self.lock();
        inner.state = state;
        inner.token = token;
        inner.generation += 1;
    }
}

impl<S: KeyValueStorage, A: Authenticator> SessionStore<S, A> {
    /// Create a logged-out store over `storage`, authenticating with `auth`.
    ///
    /// Call [`restore`](Self::restore) to load a persisted session.
    pub fn new(storage: S, auth: A) -> Self {
        Self {
            shared: Arc::new(Shared {
                storage,
                auth,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Rebuild the in-memory state from the persisted record.
    ///
    /// Returns whether a session is active afterwards. Never fails: a missing
    /// or damaged record, or a token that no longer resolves, leaves the
    /// store logged out. Safe to call on every navigation.
    pub async fn restore(&self) -> bool {
        let generation = self.generation();
        let persisted = self.read_persisted().await;

        if self.generation() != generation {
            tracing::debug!("Discarding stale session restore");
            return self.is_logged_in();
        }

        match persisted {
            Persisted::Session { token, profile } => {
                let mut inner = self.lock();
                if inner.generation != generation {
                    tracing::debug!("Discarding stale session restore");
                    return inner.state.is_logged_in();
                }
                let pending = inner.state.pending_count();
                let same_account = inner.state.user_info().id == profile.id;
                let Some(mut state) = SessionState::logged_in(profile) else {
                    return false;
                };
                // Restoring the same account keeps counters set by views.
                if same_account {
                    state.set_pending_count(pending);
                }
                inner.state = state;
                inner.token = Some(token);
                true
            }
            Persisted::Empty => {
                let mut inner = self.lock();
                if inner.generation == generation {
                    inner.state = SessionState::logged_out();
                    inner.token = None;
                }
                inner.state.is_logged_in()
            }
            Persisted::Invalid => {
                self.logout().await;
                false
            }
        }
    }

    /// Log in with `credentials`.
    ///
    /// On success the session record is persisted before the in-memory state
    /// changes. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingCredentials` if either field is blank
    /// - `AuthError::Rejected` if the credentials are refused
    /// - `AuthError::AccountDisabled` if the account is disabled
    /// - `AuthError::InvalidProfile` if the returned profile has no ID
    /// - `AuthError::Http` / `AuthError::Server` on transport failures
    /// - `AuthError::Storage` if the record cannot be written
    pub async fn login(&self, credentials: &Credentials) -> Result<UserInfo, AuthError> {
        use secrecy::ExposeSecret;

        if credentials.username.trim().is_empty()
            || credentials.password.expose_secret().trim().is_empty()
        {
            return Err(AuthError::MissingCredentials);
        }

        let success = self.shared.auth.login(credentials).await?;
        let profile = success.profile;

        if profile.status == AccountStatus::Disabled {
            self.shared.auth.revoke(&success.token).await;
            return Err(AuthError::AccountDisabled);
        }
        let Some(state) = SessionState::logged_in(profile.clone()) else {
            self.shared.auth.revoke(&success.token).await;
            return Err(AuthError::InvalidProfile(format!(
                "profile id {} is not assigned",
                profile.id
            )));
        };

        let previous = self.read_raw().await;
        if let Err(e) = self.persist(&success.token, &profile).await {
            // Put back whatever record was there before, then drop the new token.
            self.write_raw(previous).await;
            self.shared.auth.revoke(&success.token).await;
            return Err(e);
        }

        self.install(state, Some(success.token));
        tracing::info!(
            user_id = %profile.id,
            username = %profile.username,
            role = %profile.role,
            "Logged in"
        );
        Ok(profile)
    }

    /// Log out. Resets the state, removes the persisted record and asks the
    /// authenticator to revoke the token. Never fails.
    pub async fn logout(&self) {
        let token = self.lock().token.take();
        self.install(SessionState::logged_out(), None);
        self.clear_persisted().await;

        if let Some(token) = token {
            self.shared.auth.revoke(&token).await;
            tracing::info!("Logged out");
        }
    }

    async fn persist(&self, token: &SecretString, profile: &UserInfo) -> Result<(), AuthError> {
        use secrecy::ExposeSecret;

        let json = serde_json::to_string(profile)
            .map_err(|e| AuthError::InvalidProfile(e.to_string()))?;
        let storage = &self.shared.storage;
        storage.set(keys::TOKEN, token.expose_secret()).await?;
        storage.set(keys::USER_INFO, &json).await?;
        Ok(())
    }

    async fn clear_persisted(&self) {
        for key in keys::ALL {
            if let Err(e) = self.shared.storage.remove(key).await {
                tracing::warn!(key, error = %e, "Failed to remove session key");
            }
        }
    }

    /// The raw record values, `None` where a key could not be read.
    async fn read_raw(&self) -> [(&'static str, Option<Option<String>>); 2] {
        let storage = &self.shared.storage;
        let mut raw = keys::ALL.map(|key| (key, None));
        for (key, value) in &mut raw {
            match storage.get(*key).await {
                Ok(current) => *value = Some(current),
                Err(e) => tracing::warn!(key = *key, error = %e, "Failed to read session key"),
            }
        }
        raw
    }

    /// Write back a record captured by [`read_raw`](Self::read_raw). Keys that
    /// could not be read are left alone.
    async fn write_raw(&self, raw: [(&'static str, Option<Option<String>>); 2]) {
        let storage = &self.shared.storage;
        for (key, value) in raw {
            let result = match value {
                Some(Some(value)) => storage.set(key, &value).await,
                Some(None) => storage.remove(key).await,
                None => continue,
            };
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "Failed to restore session key");
            }
        }
    }

    async fn read_persisted(&self) -> Persisted {
        let storage = &self.shared.storage;

        let token = match storage.get(keys::TOKEN).await {
            Ok(Some(token)) if !token.is_empty() => SecretString::from(token),
            Ok(_) => return Persisted::Empty,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session token");
                return Persisted::Empty;
            }
        };

        let cached = match storage.get(keys::USER_INFO).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached profile");
                return Persisted::Empty;
            }
        };

        match cached {
            Some(json) => match serde_json::from_str::<UserInfo>(&json) {
                Ok(profile) if profile.is_assigned() => Persisted::Session { token, profile },
                Ok(profile) => {
                    tracing::warn!(user_id = %profile.id, "Cached profile has no assigned id");
                    Persisted::Invalid
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cached profile is malformed");
                    Persisted::Invalid
                }
            },
            None => self.fetch_profile(token).await,
        }
    }

    /// Token-only record: resolve the profile through the authenticator and
    /// cache it.
    async fn fetch_profile(&self, token: SecretString) -> Persisted {
        let generation = self.generation();
        let profile = match self.shared.auth.fetch_profile(&token).await {
            Ok(profile) if profile.is_assigned() => profile,
            Ok(profile) => {
                tracing::warn!(user_id = %profile.id, "Fetched profile has no assigned id");
                return Persisted::Invalid;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch profile for stored token");
                return Persisted::Invalid;
            }
        };

        if self.generation() == generation {
            match serde_json::to_string(&profile) {
                Ok(json) => {
                    if let Err(e) = self.shared.storage.set(keys::USER_INFO, &json).await {
                        tracing::warn!(error = %e, "Failed to cache fetched profile");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize fetched profile"),
            }
        }
        Persisted::Session { token, profile }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use easyhome_core::{AdminRole, UserId};
    use secrecy::ExposeSecret;
    use tokio::sync::Notify;

    use crate::services::auth::{AuthSuccess, FixtureAuthenticator};
    use crate::storage::{MemoryStorage, StorageError};

    type Store = SessionStore<MemoryStorage, FixtureAuthenticator>;

    fn store() -> (Store, MemoryStorage) {
        let storage = MemoryStorage::new();
        (
            SessionStore::new(storage.clone(), FixtureAuthenticator::demo()),
            storage,
        )
    }

    fn admin_profile() -> UserInfo {
        UserInfo {
            id: UserId::new(2),
            username: "operator".to_string(),
            role: AdminRole::Admin,
            ..UserInfo::default()
        }
    }

    async fn seed(storage: &MemoryStorage, token: &str, profile_json: Option<&str>) {
        storage.set(keys::TOKEN, token).await.unwrap();
        if let Some(json) = profile_json {
            storage.set(keys::USER_INFO, json).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_restore_without_record_is_logged_out() {
        let (store, _) = store();
        assert!(!store.restore().await);
        let state = store.snapshot();
        assert!(!state.is_logged_in());
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn test_restore_cached_profile() {
        let (store, storage) = store();
        let json = serde_json::to_string(&admin_profile()).unwrap();
        seed(&storage, "t-1", Some(&json)).await;

        assert!(store.restore().await);
        assert_eq!(store.user_info(), admin_profile());
        assert_eq!(store.bearer_token().unwrap().expose_secret(), "t-1");
    }

    #[tokio::test]
    async fn test_restore_is_idempotent() {
        let (store, storage) = store();
        let json = serde_json::to_string(&admin_profile()).unwrap();
        seed(&storage, "t-1", Some(&json)).await;

        store.restore().await;
        let first = store.snapshot();
        store.restore().await;
        assert_eq!(store.snapshot(), first);

        let (empty, _) = self::store();
        empty.restore().await;
        let first = empty.snapshot();
        empty.restore().await;
        assert_eq!(empty.snapshot(), first);
    }

    #[tokio::test]
    async fn test_corrupt_profile_resets_and_clears_record() {
        let (store, storage) = store();
        seed(&storage, "t-1", Some("{\"id\": 2, \"username\":")).await;

        assert!(!store.restore().await);
        assert!(store.snapshot().is_consistent());
        assert!(!store.is_logged_in());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_zero_id_profile_is_malformed() {
        let (store, storage) = store();
        let unassigned = r#"{"id":0,"username":"","role":"admin"}"#;
        seed(&storage, "t-1", Some(unassigned)).await;

        assert!(!store.restore().await);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_profile_without_token_is_no_session() {
        let (store, storage) = store();
        let json = serde_json::to_string(&admin_profile()).unwrap();
        storage.set(keys::USER_INFO, &json).await.unwrap();

        assert!(!store.restore().await);
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_then_restore_round_trips() {
        let (store, storage) = store();
        let profile = store
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap();
        assert!(store.is_logged_in());
        assert!(storage.contains_key(keys::TOKEN));
        assert!(storage.contains_key(keys::USER_INFO));

        let reopened = SessionStore::new(storage.clone(), FixtureAuthenticator::demo());
        assert!(reopened.restore().await);
        assert_eq!(reopened.user_info(), profile);
        assert_eq!(
            reopened.bearer_token().unwrap().expose_secret(),
            store.bearer_token().unwrap().expose_secret()
        );
    }

    #[tokio::test]
    async fn test_failed_login_changes_nothing() {
        let (store, storage) = store();
        let err = store
            .login(&Credentials::new("operator", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert!(!store.is_logged_in());
        assert!(storage.is_empty());

        let err = store.login(&Credentials::new(" ", "x")).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let (store, _) = store();
        store
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap();
        let before = store.snapshot();

        assert!(store.login(&Credentials::new("root", "bad")).await.is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (store, storage) = store();
        store
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap();
        assert!(store.set_pending_count(7));

        store.logout().await;
        assert!(storage.is_empty());
        assert!(store.bearer_token().is_none());
        let state = store.snapshot();
        assert!(!state.is_logged_in());
        assert_eq!(state.pending_count(), 0);
        assert!(state.is_consistent());

        // Logging out twice is fine.
        store.logout().await;
        assert!(store.snapshot().is_consistent());
    }

    #[tokio::test]
    async fn test_in_memory_mutators() {
        let (store, storage) = store();
        assert!(!store.set_profile(admin_profile()));
        assert!(!store.set_pending_count(1));

        store
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap();
        let cached = storage.get(keys::USER_INFO).await.unwrap();

        let mut renamed = admin_profile();
        renamed.username = "operator-2".to_string();
        assert!(store.set_profile(renamed));
        assert!(store.set_pending_count(3));
        assert_eq!(store.user_info().username, "operator-2");
        assert_eq!(store.pending_count(), 3);

        // No persistence side effect.
        assert_eq!(storage.get(keys::USER_INFO).await.unwrap(), cached);
    }

    #[tokio::test]
    async fn test_restore_keeps_pending_count_for_same_account() {
        let (store, _) = store();
        store
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap();
        store.set_pending_count(5);
        assert!(store.restore().await);
        assert_eq!(store.pending_count(), 5);
    }

    #[tokio::test]
    async fn test_token_only_record_fetches_and_caches_profile() {
        let auth = FixtureAuthenticator::demo();
        let issued = auth
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap();
        let storage = MemoryStorage::new();
        seed(&storage, issued.token.expose_secret(), None).await;

        let store = SessionStore::new(storage.clone(), auth);
        assert!(store.restore().await);
        assert_eq!(store.user_info(), issued.profile);

        let cached = storage.get(keys::USER_INFO).await.unwrap().unwrap();
        let cached: UserInfo = serde_json::from_str(&cached).unwrap();
        assert_eq!(cached, issued.profile);
    }

    #[tokio::test]
    async fn test_token_only_record_with_unknown_token_clears_token() {
        let (store, storage) = store();
        seed(&storage, "fixture-unknown", None).await;

        assert!(!store.restore().await);
        assert!(!storage.contains_key(keys::TOKEN));
        assert!(store.snapshot().is_consistent());
    }

    /// Authenticator whose profile fetch waits until released.
    struct GatedAuth {
        gate: Arc<Notify>,
        entered: Arc<Notify>,
        calls: AtomicUsize,
    }

    impl Authenticator for GatedAuth {
        async fn login(&self, _credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
            Err(AuthError::Rejected(String::new()))
        }

        async fn fetch_profile(&self, _token: &SecretString) -> Result<UserInfo, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(admin_profile())
        }
    }

    #[tokio::test]
    async fn test_stale_restore_does_not_undo_logout() {
        let gate = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());
        let storage = MemoryStorage::new();
        seed(&storage, "t-1", None).await;

        let store = SessionStore::new(
            storage.clone(),
            GatedAuth {
                gate: Arc::clone(&gate),
                entered: Arc::clone(&entered),
                calls: AtomicUsize::new(0),
            },
        );

        let restoring = tokio::spawn({
            let store = store.clone();
            async move { store.restore().await }
        });

        entered.notified().await;
        store.logout().await;
        gate.notify_one();

        assert!(!restoring.await.unwrap());
        assert!(!store.is_logged_in());
        assert!(store.snapshot().is_consistent());
        assert!(storage.is_empty());
        assert_eq!(store.shared.auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_separate_handles_meet_through_the_record() {
        let storage = MemoryStorage::new();
        let auth = Arc::new(FixtureAuthenticator::demo());
        let first = SessionStore::new(storage.clone(), Arc::clone(&auth));
        let second = SessionStore::new(storage.clone(), auth);

        first
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap();
        assert!(second.restore().await);

        first.logout().await;
        // The other handle keeps its state until it restores again.
        assert!(second.is_logged_in());
        assert!(!second.restore().await);
        assert!(second.snapshot().is_consistent());
    }

    /// Storage that refuses every write.
    #[derive(Default)]
    struct ReadOnlyStorage(MemoryStorage);

    impl KeyValueStorage for ReadOnlyStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("read-only")))
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key).await
        }
    }

    /// Storage whose profile writes fail once `fail_profile` is set.
    #[derive(Default)]
    struct FlakyProfileStorage {
        inner: MemoryStorage,
        fail_profile: std::sync::atomic::AtomicBool,
    }

    impl KeyValueStorage for FlakyProfileStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == keys::USER_INFO && self.fail_profile.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_relogin_write_keeps_previous_record() {
        let storage = FlakyProfileStorage::default();
        let records = storage.inner.clone();
        let store = SessionStore::new(storage, FixtureAuthenticator::demo());
        let root = store
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap();
        let token = records.get(keys::TOKEN).await.unwrap();
        let cached = records.get(keys::USER_INFO).await.unwrap();

        store.shared.storage.fail_profile.store(true, Ordering::SeqCst);
        let err = store
            .login(&Credentials::new("operator", "operator-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));

        // The record still describes the root session, token and profile both.
        assert_eq!(records.get(keys::TOKEN).await.unwrap(), token);
        assert_eq!(records.get(keys::USER_INFO).await.unwrap(), cached);
        assert_eq!(store.user_info(), root);

        // The token issued for the failed login was revoked; only root's remains.
        assert_eq!(store.shared.auth.issued_count(), 1);

        assert!(store.restore().await);
        assert_eq!(store.user_info(), root);
    }

    #[tokio::test]
    async fn test_failed_first_login_write_leaves_no_record() {
        let storage = FlakyProfileStorage::default();
        storage.fail_profile.store(true, Ordering::SeqCst);
        let records = storage.inner.clone();
        let store = SessionStore::new(storage, FixtureAuthenticator::demo());

        assert!(
            store
                .login(&Credentials::new("root", "root-pass"))
                .await
                .is_err()
        );
        assert!(records.is_empty());
        assert_eq!(store.shared.auth.issued_count(), 0);
        assert!(!store.restore().await);
    }

    #[tokio::test]
    async fn test_login_fails_when_record_cannot_be_written() {
        let store = SessionStore::new(ReadOnlyStorage::default(), FixtureAuthenticator::demo());
        let err = store
            .login(&Credentials::new("root", "root-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert!(!store.is_logged_in());
    }
}
