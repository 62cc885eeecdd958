//! Storage inside a browser session managed by `tower-sessions`.
//!
//! In the admin console each browser gets its own `Session`, so the persisted
//! record is scoped to the browser that logged in, the same way it would be
//! with browser-local storage.

use tower_sessions::Session;

use super::{KeyValueStorage, StorageError};

impl KeyValueStorage for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(Self::get::<String>(self, key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::remove::<String>(self, key).await?;
        Ok(())
    }
}
