//! Mock Auth Gateway Implementation
//!
//! In-memory gateway for testing the session layer without a running
//! backend. Outcomes are scripted per call; every call is counted and
//! refresh requests record the token they carried, so tests can assert
//! exactly how many network round-trips happened.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::{
    verify_admin_role, AdminRegistrationRequest, ApiError, AuthGateway, AuthResponse, Credentials,
    RefreshResponse, RegistrationRequest,
};

#[derive(Debug, Default)]
struct MockState {
    auth_outcomes: VecDeque<Result<AuthResponse, ApiError>>,
    refresh_outcomes: VecDeque<Result<RefreshResponse, ApiError>>,
    login_calls: usize,
    admin_login_calls: usize,
    register_calls: usize,
    refresh_calls: usize,
    refresh_tokens_seen: Vec<String>,
    healthy: bool,
}

/// Mock auth gateway for testing.
#[derive(Debug, Clone)]
pub struct MockAuthGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockAuthGateway {
    /// Create a new mock gateway with no scripted outcomes.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                healthy: true,
                ..MockState::default()
            })),
        }
    }

    /// Script the next outcome for a token-bearing endpoint (login,
    /// admin login, registration). Outcomes are consumed in order.
    pub fn push_auth_outcome(&self, outcome: Result<AuthResponse, ApiError>) {
        self.state.lock().unwrap().auth_outcomes.push_back(outcome);
    }

    /// Script the next refresh outcome. Outcomes are consumed in order.
    pub fn push_refresh_outcome(&self, outcome: Result<RefreshResponse, ApiError>) {
        self.state
            .lock()
            .unwrap()
            .refresh_outcomes
            .push_back(outcome);
    }

    /// Toggle the health probe result.
    pub fn set_healthy(&self, healthy: bool) {
        self.state.lock().unwrap().healthy = healthy;
    }

    pub fn login_calls(&self) -> usize {
        self.state.lock().unwrap().login_calls
    }

    pub fn admin_login_calls(&self) -> usize {
        self.state.lock().unwrap().admin_login_calls
    }

    pub fn register_calls(&self) -> usize {
        self.state.lock().unwrap().register_calls
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }

    /// Tokens carried by refresh calls, oldest first.
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.state.lock().unwrap().refresh_tokens_seen.clone()
    }

    fn next_auth_outcome(&self) -> Result<AuthResponse, ApiError> {
        self.state
            .lock()
            .unwrap()
            .auth_outcomes
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Request("no scripted auth outcome".to_string())))
    }
}

impl Default for MockAuthGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthGateway for MockAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %credentials.username, "Mock gateway login");
        self.state.lock().unwrap().login_calls += 1;
        self.next_auth_outcome()
    }

    async fn admin_login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %credentials.username, "Mock gateway admin login");
        self.state.lock().unwrap().admin_login_calls += 1;
        self.next_auth_outcome().and_then(verify_admin_role)
    }

    async fn register(&self, _request: &RegistrationRequest) -> Result<AuthResponse, ApiError> {
        self.state.lock().unwrap().register_calls += 1;
        self.next_auth_outcome()
    }

    async fn admin_register(
        &self,
        _request: &AdminRegistrationRequest,
    ) -> Result<AuthResponse, ApiError> {
        self.state.lock().unwrap().register_calls += 1;
        self.next_auth_outcome()
    }

    async fn refresh(&self, token: &str) -> Result<RefreshResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.refresh_calls += 1;
        state.refresh_tokens_seen.push(token.to_string());
        state
            .refresh_outcomes
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Request("no scripted refresh outcome".to_string())))
    }

    async fn health(&self) -> Result<(), ApiError> {
        if self.state.lock().unwrap().healthy {
            Ok(())
        } else {
            Err(ApiError::Request("backend unreachable".to_string()))
        }
    }
}
