use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, Result},
};

/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
///
/// One known client defect is tolerated: some clients serialize their whole
/// session object into the header, so the token segment arrives as a JSON
/// object carrying an `access_token` field. That nested token is extracted
/// before verification.
pub fn parse_bearer_token(header: Option<&str>) -> Result<String> {
    let raw = header.ok_or(AppError::MissingCredential)?;
    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AppError::MissingCredential)?
        .trim();

    if token.is_empty() {
        return Err(AppError::MissingCredential);
    }

    if token.starts_with('{') {
        if let Ok(session) = serde_json::from_str::<serde_json::Value>(token) {
            if let Some(nested) = session.get("access_token").and_then(|v| v.as_str()) {
                return Ok(nested.to_string());
            }
        }
    }

    Ok(token.to_string())
}

/// Verifies a bearer token and resolves it to a stable user id.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Uuid>;
}

/// Production verifier: asks the hosted identity service who the token
/// belongs to. Read-only; no session is created or refreshed here.
#[derive(Clone)]
pub struct AuthServiceVerifier {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

impl AuthServiceVerifier {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.auth_base_url.trim_end_matches('/').to_string(),
            service_key: config.auth_service_key.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TokenVerifier for AuthServiceVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("token verification request failed: {e}");
                AppError::InvalidCredential
            })?;

        if !response.status().is_success() {
            return Err(AppError::InvalidCredential);
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|_| AppError::InvalidCredential)?;

        Ok(user.id)
    }
}
