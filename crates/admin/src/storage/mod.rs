//! Key-value storage for the persisted session record.
//!
//! The store only ever sees opaque string values under fixed keys; whether
//! they live in memory, in a JSON file, or in a browser session is decided by
//! the [`KeyValueStorage`] implementation. A missing key is `Ok(None)`, never
//! an error.

mod file;
mod memory;
mod session;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::future::Future;

use thiserror::Error;

/// Storage keys for the persisted session record.
pub mod keys {
    /// Bearer token issued at login. Its presence is the authentication flag.
    pub const TOKEN: &str = "admin_token";

    /// JSON of the cached `UserInfo`.
    pub const USER_INFO: &str = "admin_user_info";

    /// Every key owned by the session record.
    pub const ALL: [&str; 2] = [TOKEN, USER_INFO];
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The per-browser session could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Asynchronous string key-value storage.
pub trait KeyValueStorage: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
