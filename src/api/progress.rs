use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::ApiResponse,
    services::{progress_service::SubmitScoreInput, ProgressService},
};

use super::{require_user, AppState};

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    /// Clients have shipped both spellings.
    #[serde(rename = "categorySlug", alias = "category_slug")]
    pub category_slug: Option<String>,
    pub level: Option<i32>,
    pub language: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MixedRushFinalRequest {
    pub score: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub message: String,
}

/// POST /api/progress/submit-score
pub async fn submit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitScoreRequest>,
) -> Result<Json<ApiResponse<ProgressResponse>>> {
    let user_id = require_user(&headers, &state).await?;

    let service = ProgressService::new(state.db.clone());
    service
        .submit_score(
            user_id,
            SubmitScoreInput {
                category_slug: req.category_slug,
                level: req.level,
                language: req.language,
                points: req.points,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ProgressResponse {
        message: "Score submitted successfully".to_string(),
    })))
}

/// POST /api/progress/submit-mixed-rush-final
pub async fn submit_mixed_rush_final(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MixedRushFinalRequest>,
) -> Result<Json<ApiResponse<ProgressResponse>>> {
    let user_id = require_user(&headers, &state).await?;

    let service = ProgressService::new(state.db.clone());
    service.submit_mixed_rush_final(user_id, req.score).await?;

    Ok(Json(ApiResponse::success(ProgressResponse {
        message: "Mixed rush score submitted successfully".to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_score_request_accepts_both_slug_spellings() {
        let camel: SubmitScoreRequest =
            serde_json::from_value(serde_json::json!({ "categorySlug": "animals", "level": 2 }))
                .unwrap();
        assert_eq!(camel.category_slug.as_deref(), Some("animals"));

        let snake: SubmitScoreRequest =
            serde_json::from_value(serde_json::json!({ "category_slug": "food", "level": 1 }))
                .unwrap();
        assert_eq!(snake.category_slug.as_deref(), Some("food"));
    }
}
