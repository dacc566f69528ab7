//! Durable client-side session storage
//!
//! String key/value abstraction mirroring the browser `localStorage`
//! contract the front-end persists sessions under. Reads and writes are
//! synchronous; `restore()` runs before the first authenticated view
//! renders, so the store must answer without suspending.
//!
//! The keys are the persistence contract:
//!
//! | Key | Content |
//! |---|---|
//! | `token` | normalized bearer token |
//! | `userId` | subject identifier |
//! | `userName` | display name |
//! | `userRole` | role tag (`ADMIN`, `USER`) |
//! | `loginTimestamp` | ms-since-epoch, set at establish time |

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Persisted session keys.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_ID: &str = "userId";
    pub const USER_NAME: &str = "userName";
    pub const USER_ROLE: &str = "userRole";
    pub const LOGIN_TIMESTAMP: &str = "loginTimestamp";

    /// Every key the session layer owns; `clear()` removes them all.
    pub const ALL: [&str; 5] = [TOKEN, USER_ID, USER_NAME, USER_ROLE, LOGIN_TIMESTAMP];
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable string key/value store for session state.
pub trait SessionStore: Send + Sync {
    /// Read a value. Absent keys are `None`, never an error.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
