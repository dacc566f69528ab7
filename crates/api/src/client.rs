//! HTTP Auth Gateway Implementation
//!
//! Real HTTP client for the blood-bank backend auth endpoints under
//! `{base_url}/auth/*`, using reqwest with a bounded request timeout.

use std::time::Duration;

use serde::Deserialize;

use crate::{
    verify_admin_role, AdminRegistrationRequest, ApiConfig, ApiError, AuthGateway, AuthResponse,
    Credentials, RefreshResponse, RegistrationRequest,
};

/// Error body the backend returns on failures. Some endpoints send a bare
/// string instead; both are handled.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Real HTTP auth gateway for the blood-bank REST backend.
pub struct HttpAuthGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthGateway {
    /// Create a new HTTP gateway from configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_for_auth<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure_from(status, response).await);
        }

        response
            .json::<AuthResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Map a non-2xx response to the error taxonomy: 401 means the credential
/// (or the attempt) was rejected outright, everything else keeps the
/// status and whatever message the backend sent.
async fn failure_from(status: reqwest::StatusCode, response: reqwest::Response) -> ApiError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or_else(|_| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status == reqwest::StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Response {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait::async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %credentials.username, "Attempting login");
        self.post_for_auth("/auth/login", credentials).await
    }

    async fn admin_login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %credentials.username, "Attempting admin login");
        let response = self.post_for_auth("/auth/admin/login", credentials).await?;
        verify_admin_role(response)
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<AuthResponse, ApiError> {
        self.post_for_auth("/auth/register", request).await
    }

    async fn admin_register(
        &self,
        request: &AdminRegistrationRequest,
    ) -> Result<AuthResponse, ApiError> {
        self.post_for_auth("/auth/admin/register", request).await
    }

    async fn refresh(&self, token: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure_from(status, response).await);
        }

        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure_from(status, response).await);
        }
        Ok(())
    }
}
