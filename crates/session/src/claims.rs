//! Bearer-token structure checks and payload decoding
//!
//! Tokens are JWT-shaped (three dot-separated base64url segments) but are
//! never verified cryptographically here — the backend owns verification.
//! The payload is decoded only to read identity and expiry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer};

use crate::error::SessionError;

/// Payload fields the client consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject claim, the account email.
    pub sub: String,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Role tag embedded by the backend, when present.
    #[serde(default)]
    pub role: Option<String>,
    /// User id claim; the backend emits a number, older tokens a string.
    #[serde(rename = "userId", default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<String>,
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Number(i64),
        Text(String),
    }

    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|value| match value {
        IdValue::Number(n) => n.to_string(),
        IdValue::Text(s) => s,
    }))
}

/// Normalize a token received from the backend or from storage: trim
/// whitespace and strip one layer of surrounding double quotes (an
/// upstream serialization artifact seen in the wild).
pub fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Split a token into its three segments. Fails unless there are exactly
/// three non-empty dot-separated parts.
pub(crate) fn split_segments(token: &str) -> Result<[&str; 3], SessionError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok([header, payload, signature])
        }
        _ => Err(SessionError::MalformedToken(
            "token must have 3 dot-separated segments".to_string(),
        )),
    }
}

impl TokenClaims {
    /// Decode the payload segment of a structurally-valid token.
    pub fn decode(token: &str) -> Result<TokenClaims, SessionError> {
        let [_, payload, _] = split_segments(token)?;

        // Tolerate padded base64url; standard JWTs are unpadded.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::MalformedToken(format!("payload is not claims JSON: {}", e)))
    }
}
