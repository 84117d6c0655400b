pub mod achievements;
pub mod duel;
pub mod games;
pub mod health;
pub mod leaderboard;
pub mod profile;
pub mod progress;
pub mod social;

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::services::identity::{self, TokenVerifier};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub verifier: Arc<dyn TokenVerifier>,
    pub config: Config,
}

/// Resolves the caller's bearer token to a user id, or fails with 401.
/// Every protected handler calls this first and short-circuits.
pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<Uuid> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = identity::parse_bearer_token(auth_header)?;
    state.verifier.verify(&token).await
}
