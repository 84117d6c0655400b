use axum::{extract::State, http::HeaderMap, Json};

use crate::{
    error::Result,
    models::{ApiResponse, EarnedAchievement},
};

use super::{require_user, AppState};

/// GET /api/achievements
pub async fn my_achievements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<EarnedAchievement>>>> {
    let user_id = require_user(&headers, &state).await?;
    let achievements = state.db.earned_achievements(user_id).await?;
    Ok(Json(ApiResponse::success(achievements)))
}
