//! Persistent key-value storage for session state.
//!
//! This module provides:
//! - `KeyValueStore`: string-keyed storage shared by every session operation
//! - `FileStore`: JSON-file backed store that survives restarts
//! - `MemoryStore`: process-local store for tests and ephemeral sessions
//!
//! There is no locking discipline across processes: last writer wins.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Key holding the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key holding the user record returned at login
pub const USER_DATA_KEY: &str = "user_data";
/// Key holding the user record refreshed from the profile endpoint
pub const USER_KEY: &str = "user";
/// Key holding the "remember me" flag
pub const REMEMBER_KEY: &str = "remember";

/// Every key owned by the session layer
pub const SESSION_KEYS: [&str; 5] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_DATA_KEY,
    USER_KEY,
    REMEMBER_KEY,
];

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
