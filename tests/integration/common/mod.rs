//! Shared fixtures for session integration tests

use std::sync::Arc;
use std::time::Duration;

use bloodbank_api::mock::MockAuthGateway;
use bloodbank_api::{
    AdminRegistrationRequest, ApiError, AuthGateway, AuthResponse, Credentials, RefreshResponse,
    RegistrationRequest,
};
use bloodbank_session::{MemoryStore, SessionConfig, SessionManager, SessionStore};

/// Mint a real HS256 token with the claims the backend embeds.
pub fn mint_token(exp: i64, role: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        role: &'a str,
        #[serde(rename = "userId")]
        user_id: i64,
    }

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &Claims {
            sub: "donor@example.com",
            exp,
            role,
            user_id: 42,
        },
        &jsonwebtoken::EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("token minting")
}

/// Backend response shape for a successful login/registration.
pub fn auth_response(token: &str, role: &str) -> AuthResponse {
    AuthResponse {
        token: token.to_string(),
        user_id: Some("42".to_string()),
        name: Some("Dana Donor".to_string()),
        email: Some("donor@example.com".to_string()),
        role: role.to_string(),
        message: None,
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "donor@example.com".to_string(),
        password: "secret".to_string(),
    }
}

/// A session manager wired to a mock gateway and an in-memory store.
pub struct TestSession {
    pub store: Arc<MemoryStore>,
    pub gateway: MockAuthGateway,
    pub manager: Arc<SessionManager>,
}

impl TestSession {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = MockAuthGateway::new();
        let manager = Arc::new(SessionManager::new(
            store.clone() as Arc<dyn SessionStore>,
            Arc::new(gateway.clone()),
            SessionConfig::default(),
        ));
        Self {
            store,
            gateway,
            manager,
        }
    }
}

/// Gateway that delays refresh before delegating, so tests can overlap
/// calls with other session operations.
pub struct SlowGateway {
    pub inner: MockAuthGateway,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl AuthGateway for SlowGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.inner.login(credentials).await
    }

    async fn admin_login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.inner.admin_login(credentials).await
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<AuthResponse, ApiError> {
        self.inner.register(request).await
    }

    async fn admin_register(
        &self,
        request: &AdminRegistrationRequest,
    ) -> Result<AuthResponse, ApiError> {
        self.inner.admin_register(request).await
    }

    async fn refresh(&self, token: &str) -> Result<RefreshResponse, ApiError> {
        tokio::time::sleep(self.delay).await;
        self.inner.refresh(token).await
    }

    async fn health(&self) -> Result<(), ApiError> {
        self.inner.health().await
    }
}
