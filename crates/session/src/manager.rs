//! Session lifecycle: restore, establish, refresh, clear
//!
//! One owning [`SessionManager`] instance is created at application start
//! and injected into consumers. Restore and establish are synchronous;
//! refresh is the only operation that touches the network.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use bloodbank_api::{ApiError, AuthGateway, AuthResponse};

use crate::claims::{normalize_token, TokenClaims};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::identity::{Identity, Role};
use crate::store::{keys, SessionStore, StoreError};

/// Point-in-time view of the session for consumers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub identity: Option<Identity>,
    /// When the session was established or restored; diagnostics only.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Outcome of a [`SessionManager::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new token was obtained and stored.
    Refreshed,
    /// The held token is not yet due; no request was made.
    StillValid,
    /// No session is held; nothing to refresh.
    NoSession,
    /// The backend rejected the credential outright; the session was
    /// cleared.
    Rejected,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    identity: Option<Identity>,
    loaded_at: Option<DateTime<Utc>>,
    /// Bumped whenever a token is applied. A refresh call queued behind
    /// the gate uses this to detect that another call already did the
    /// work.
    epoch: u64,
}

/// Single authority for the authentication session.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn AuthGateway>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Create a manager over the given store and gateway. The manager
    /// starts logged out; call [`restore`](Self::restore) to rehydrate.
    pub fn new(
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn AuthGateway>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            state: Mutex::new(SessionState::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Rehydrate the session from durable storage. Invoked once at
    /// application start, before any route that depends on auth state
    /// renders. Every failure degrades to "logged out" — this never
    /// returns an error. Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        let Some(stored) = self.store.get(keys::TOKEN) else {
            tracing::debug!("no persisted token, starting logged out");
            return false;
        };

        let token = normalize_token(&stored);
        let claims = match TokenClaims::decode(&token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(%err, "persisted token is malformed, purging session");
                self.purge_storage();
                return false;
            }
        };

        let now = Utc::now();
        if claims.exp <= now.timestamp() {
            tracing::info!(exp = claims.exp, "persisted token expired, purging session");
            self.purge_storage();
            return false;
        }

        // The token's embedded role wins; the stored tag is the fallback
        // for tokens minted without one.
        let role_tag = claims.role.clone().or_else(|| self.store.get(keys::USER_ROLE));
        let role = match role_tag.as_deref().map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(err)) => {
                tracing::warn!(%err, "persisted role tag is unusable, purging session");
                self.purge_storage();
                return false;
            }
            None => {
                tracing::warn!("no role tag in token or storage, purging session");
                self.purge_storage();
                return false;
            }
        };

        let identity = Identity {
            subject: claims.sub,
            user_id: claims.user_id.or_else(|| self.store.get(keys::USER_ID)),
            name: self.store.get(keys::USER_NAME),
            role,
            expires_at: claims.exp,
        };

        tracing::info!(subject = %identity.subject, role = %identity.role, "session restored");
        self.apply(token, identity, now);
        true
    }

    /// Establish a session from a token-bearing backend response. The
    /// role returned by the endpoint is authoritative: a conflicting
    /// role claim inside the token is logged, not honored, because the
    /// endpoint called (admin vs regular login) is the real signal.
    ///
    /// Validation happens before any mutation; on failure neither memory
    /// nor storage changes.
    pub fn establish(&self, response: &AuthResponse) -> Result<()> {
        let token = normalize_token(&response.token);
        if token.is_empty() {
            return Err(SessionError::MissingToken);
        }

        let claims = TokenClaims::decode(&token)?;
        let now = Utc::now();
        if claims.exp <= now.timestamp() {
            return Err(SessionError::ExpiredToken);
        }

        let role: Role = response.role.parse()?;
        match claims.role.as_deref() {
            Some(embedded) if embedded != role.as_str() => {
                tracing::warn!(
                    token_role = embedded,
                    endpoint_role = %role,
                    "token role does not match the endpoint's role; keeping the endpoint's"
                );
            }
            None => tracing::warn!("token payload carries no role claim"),
            _ => {}
        }

        let identity = Identity {
            subject: claims.sub,
            user_id: response.user_id.clone().or(claims.user_id),
            name: response.name.clone(),
            role,
            expires_at: claims.exp,
        };

        if let Err(err) = self.persist(&token, &identity, now) {
            // storage must never hold a half-written session
            self.purge_storage();
            return Err(err.into());
        }

        tracing::info!(subject = %identity.subject, role = %identity.role, "session established");
        self.apply(token, identity, now);
        Ok(())
    }

    /// Drop the session: reset memory and remove every persisted key.
    /// Idempotent; safe to call when already logged out.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.token = None;
            state.identity = None;
            state.loaded_at = None;
        }
        self.purge_storage();
        tracing::debug!("session cleared");
    }

    /// True when a structurally-valid token is held and its expiry is
    /// still in the future.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    /// [`is_authenticated`](Self::is_authenticated) against a supplied
    /// clock value.
    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.lock().unwrap();
        state
            .identity
            .as_ref()
            .map(|identity| identity.expires_at > now.timestamp())
            .unwrap_or(false)
    }

    /// Pure predicate: a token is held and expires within the refresh
    /// window of `now` (boundary inclusive), or has already expired.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.lock().unwrap();
        match &state.identity {
            Some(identity) => {
                identity.expires_at - now.timestamp() <= self.config.refresh_window_secs
            }
            None => false,
        }
    }

    /// Exchange a soon-expiring token for a fresh one. Overlapping calls
    /// are deduplicated to a single network request; a call that was
    /// queued behind an in-flight refresh reports `Refreshed` without
    /// issuing its own. Network failures leave the session untouched and
    /// surface as an error for the caller to retry; a 401 clears the
    /// session.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let now = Utc::now();
        let observed_epoch = {
            let state = self.state.lock().unwrap();
            if state.token.is_none() {
                tracing::debug!("no token to refresh");
                return Ok(RefreshOutcome::NoSession);
            }
            state.epoch
        };
        if !self.should_refresh(now) {
            return Ok(RefreshOutcome::StillValid);
        }

        let _gate = self.refresh_gate.lock().await;

        // Re-check under the gate: another call may have refreshed (or a
        // logout may have landed) while this one waited.
        let token = {
            let state = self.state.lock().unwrap();
            if state.epoch != observed_epoch {
                return Ok(RefreshOutcome::Refreshed);
            }
            match &state.token {
                Some(token) => token.clone(),
                None => return Ok(RefreshOutcome::NoSession),
            }
        };

        tracing::debug!("token expiring soon, requesting refresh");
        let response = match self.gateway.refresh(&token).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized(message)) => {
                tracing::warn!(%message, "refresh rejected, clearing session");
                self.clear();
                return Ok(RefreshOutcome::Rejected);
            }
            Err(err) => {
                tracing::warn!(%err, "refresh request failed, keeping current session");
                return Err(err.into());
            }
        };

        let new_token = match response.token {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Err(SessionError::MissingToken),
        };

        // A clear() that ran while the request was in flight wins;
        // applying the result would resurrect a logged-out session.
        let identity = {
            let state = self.state.lock().unwrap();
            match &state.identity {
                Some(identity) => identity.clone(),
                None => {
                    tracing::debug!("session cleared mid-refresh, discarding new token");
                    return Ok(RefreshOutcome::NoSession);
                }
            }
        };

        self.establish(&AuthResponse {
            token: new_token,
            user_id: identity.user_id,
            name: identity.name,
            email: None,
            role: identity.role.as_str().to_string(),
            message: None,
        })?;

        tracing::info!("token refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// The held token, if any.
    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    /// The held identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.state.lock().unwrap().identity.clone()
    }

    /// `Authorization` header value for authenticated requests.
    pub fn bearer(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }

    /// Point-in-time view of the whole session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().unwrap();
        SessionSnapshot {
            token: state.token.clone(),
            identity: state.identity.clone(),
            loaded_at: state.loaded_at,
        }
    }

    fn apply(&self, token: String, identity: Identity, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.token = Some(token);
        state.identity = Some(identity);
        state.loaded_at = Some(now);
        state.epoch += 1;
    }

    fn persist(&self, token: &str, identity: &Identity, now: DateTime<Utc>) -> std::result::Result<(), StoreError> {
        self.store.set(keys::TOKEN, token)?;
        if let Some(user_id) = &identity.user_id {
            self.store.set(keys::USER_ID, user_id)?;
        }
        if let Some(name) = &identity.name {
            self.store.set(keys::USER_NAME, name)?;
        }
        self.store.set(keys::USER_ROLE, identity.role.as_str())?;
        self.store
            .set(keys::LOGIN_TIMESTAMP, &now.timestamp_millis().to_string())?;
        Ok(())
    }

    fn purge_storage(&self) {
        for key in keys::ALL {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(%err, key, "failed to remove session key");
            }
        }
    }
}
