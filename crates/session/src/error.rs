//! Session errors

use thiserror::Error;

/// Convenience result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session error taxonomy. Malformed and expired credentials are expected
/// conditions: `restore` swallows them entirely, `establish` and `refresh`
/// return them as values. Nothing here ever panics.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No usable token in response")]
    MissingToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token already expired")]
    ExpiredToken,

    #[error("Unknown role tag: {0}")]
    UnknownRole(String),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::store::StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] bloodbank_api::ApiError),
}
