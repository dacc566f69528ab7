//! Blood-bank backend API client
//!
//! Client for the authentication surface of the blood-bank REST backend:
//! - Login, admin login, registration, admin registration
//! - Token refresh with the current bearer credential
//! - Reachability probe against the health endpoint
//! - Mock gateway for testing without a running backend
//!
//! Everything else the backend offers (donors, inventory, appointments)
//! is consumed elsewhere; this crate only covers what the session layer
//! needs.

pub mod client;
pub mod mock;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Gateway configuration error: {0}")]
    Configuration(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Backend returned {status}: {message}")]
    Response { status: u16, message: String },

    #[error("Credential rejected: {0}")]
    Unauthorized(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Login credentials. The backend uses the account email as the username.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// New-account registration request.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "bloodType", skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
}

/// Admin registration request; carries the registration code the backend
/// checks before granting the ADMIN role.
#[derive(Debug, Clone, Serialize)]
pub struct AdminRegistrationRequest {
    #[serde(flatten)]
    pub registration: RegistrationRequest,
    #[serde(rename = "registrationCode")]
    pub registration_code: String,
}

/// Token-bearing response returned by login and registration endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    /// The backend emits this claim as a number; older deployments used a
    /// string. Both are accepted.
    #[serde(rename = "userId", default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub message: Option<String>,
}

/// Response of the refresh endpoint. A 2xx body without a token is a
/// failure for the caller, not a success.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: Option<String>,
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

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Gateway provider (http, mock)
    pub provider: String,
    /// Base URL of the backend REST API, including the `/api` prefix
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create gateway config from environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("BLOODBANK_API_PROVIDER").unwrap_or_else(|_| "http".to_string());

        let base_url = std::env::var("BLOODBANK_API_URL")
            .unwrap_or_else(|_| "http://localhost:8081/api".to_string());

        let timeout_secs = std::env::var("BLOODBANK_API_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            provider,
            base_url,
            timeout_secs,
        })
    }
}

/// Auth gateway trait for different implementations.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// POST `/auth/login` with username/password.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// POST `/auth/admin/login`. Responses whose role is not `ADMIN` are
    /// rejected before they reach the caller.
    async fn admin_login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// POST `/auth/register`.
    async fn register(&self, request: &RegistrationRequest) -> Result<AuthResponse, ApiError>;

    /// POST `/auth/admin/register` with the admin registration code.
    async fn admin_register(
        &self,
        request: &AdminRegistrationRequest,
    ) -> Result<AuthResponse, ApiError>;

    /// POST `/auth/refresh` carrying the current token as a Bearer
    /// credential. A 401 maps to [`ApiError::Unauthorized`].
    async fn refresh(&self, token: &str) -> Result<RefreshResponse, ApiError>;

    /// GET `/health`.
    async fn health(&self) -> Result<(), ApiError>;
}

/// Reject an admin-login response that did not come back with the ADMIN
/// role. Both gateway implementations apply this before returning.
pub(crate) fn verify_admin_role(response: AuthResponse) -> Result<AuthResponse, ApiError> {
    if response.role == "ADMIN" {
        Ok(response)
    } else {
        Err(ApiError::Unauthorized(format!(
            "admin access only, got role {}",
            response.role
        )))
    }
}

/// Factory for creating AuthGateway implementations.
pub struct AuthGatewayFactory;

impl AuthGatewayFactory {
    /// Create an AuthGateway based on configuration.
    pub fn create(config: ApiConfig) -> Result<Box<dyn AuthGateway>, ApiError> {
        match config.provider.as_str() {
            "http" => {
                tracing::info!(base_url = %config.base_url, "Creating HTTP auth gateway");
                Ok(Box::new(client::HttpAuthGateway::new(&config)?))
            }
            "mock" => {
                tracing::info!("Creating mock auth gateway");
                Ok(Box::new(mock::MockAuthGateway::new()))
            }
            provider => Err(ApiError::Configuration(format!(
                "Unknown gateway provider: {}. Supported providers: http, mock",
                provider
            ))),
        }
    }
}
