//! Identity projection and role tags

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Account role tag. Gates which routes and actions the UI permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// The wire/storage form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    /// Check if this role can access admin routes.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = SessionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(SessionError::UnknownRole(other.to_string())),
        }
    }
}

/// Read-only projection of the authenticated account. Derived from the
/// bearer token plus the display fields recorded at login time; never set
/// independently of the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject claim, the account email.
    pub subject: String,
    /// Backend user id, when known.
    pub user_id: Option<String>,
    /// Display name, when known.
    pub name: Option<String>,
    pub role: Role,
    /// Token expiry, seconds since epoch.
    pub expires_at: i64,
}
