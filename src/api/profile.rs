use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, CategoryProgressRow, EarnedAchievement, Profile},
};

use super::{require_user, AppState};

/// A profile with its per-category progress and earned achievements, the
/// aggregate the profile screen renders in one fetch.
#[derive(Debug, Serialize)]
pub struct FullProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub total_score: i64,
    pub mixed_rush_highscore: i64,
    pub progress: Vec<CategoryProgressRow>,
    pub achievements: Vec<EarnedAchievement>,
}

async fn full_profile(state: &AppState, profile: Profile) -> Result<FullProfile> {
    let progress = state.db.category_progress_for_user(profile.id).await?;
    let achievements = state.db.earned_achievements(profile.id).await?;

    Ok(FullProfile {
        id: profile.id,
        username: profile.username,
        avatar_url: profile.avatar_url,
        total_score: profile.total_score,
        mixed_rush_highscore: profile.mixed_rush_highscore,
        progress,
        achievements,
    })
}

/// GET /api/profile
pub async fn my_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<FullProfile>>> {
    let user_id = require_user(&headers, &state).await?;

    let profile = state
        .db
        .profile_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ApiResponse::success(full_profile(&state, profile).await?)))
}

/// GET /api/profile/{username}
pub async fn profile_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<FullProfile>>> {
    let user_id = state
        .db
        .profile_id_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))?;

    let profile = state
        .db
        .profile_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))?;

    Ok(Json(ApiResponse::success(full_profile(&state, profile).await?)))
}
