use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, GameItem, PinnedQuestion, SubmittedQuestion},
    services::{
        duel_service::{CreateDuelInput, DuelBuckets, SubmitResultInput},
        ContentSelector, DuelService,
    },
};

use super::{require_user, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct CreateDuelRequest {
    pub challenged_id: Option<Uuid>,
    pub difficulty_level: Option<i32>,
    pub challenger_score: Option<i32>,
    pub challenger_time_taken: Option<i32>,
    pub challenger_answers: Option<serde_json::Value>,
    #[serde(default)]
    pub questions: Vec<SubmittedQuestion>,
}

/// Questions go back to clients nested under a `game_item` key; both players
/// render the same wrapper shape.
#[derive(Debug, Serialize)]
pub struct WrappedQuestion {
    pub game_item: GameItem,
}

#[derive(Debug, Serialize)]
pub struct CreateDuelResponse {
    pub message: String,
    pub duel_id: Uuid,
    pub challenger_score: i32,
    pub difficulty_level: i32,
    pub questions: Vec<WrappedQuestion>,
}

#[derive(Debug, Serialize)]
pub struct DuelQuestionsResponse {
    pub questions: Vec<PinnedQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDuelResultRequest {
    pub score: Option<i32>,
    pub time_taken: Option<i32>,
    pub answers: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct DuelResultResponse {
    pub message: String,
    pub duel_id: Uuid,
    pub your_score: i32,
    pub challenger_score: i32,
    pub winner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub difficulty_level: Option<serde_json::Value>,
    pub duel_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<WrappedQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn wrap(items: Vec<GameItem>) -> Vec<WrappedQuestion> {
    items
        .into_iter()
        .map(|game_item| WrappedQuestion { game_item })
        .collect()
}

fn wrap_pinned(questions: Vec<PinnedQuestion>) -> Vec<WrappedQuestion> {
    questions
        .into_iter()
        .map(|q| WrappedQuestion {
            game_item: GameItem {
                id: q.game_item_id,
                game_type_id: q.game_type_id,
                category_id: q.category_id,
                level: q.level,
                content: q.content,
            },
        })
        .collect()
}

/// Difficulty may arrive as a JSON number or a numeric string depending on
/// the client; both are accepted.
fn coerce_difficulty(value: Option<&serde_json::Value>) -> Result<i32> {
    let value =
        value.ok_or_else(|| AppError::BadRequest("Difficulty level is required.".to_string()))?;

    let level = if let Some(n) = value.as_i64() {
        n
    } else if let Some(s) = value.as_str() {
        s.trim().parse::<i64>().map_err(|_| {
            AppError::BadRequest("Difficulty level must be an integer.".to_string())
        })?
    } else {
        return Err(AppError::BadRequest(
            "Difficulty level must be an integer.".to_string(),
        ));
    };

    if !(0..=5).contains(&level) {
        return Err(AppError::BadRequest(
            "Invalid difficulty level. Must be 0-5.".to_string(),
        ));
    }
    Ok(level as i32)
}

// ==================== HANDLERS ====================

/// POST /api/duel/create-duel
pub async fn create_duel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateDuelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateDuelResponse>>)> {
    let user_id = require_user(&headers, &state).await?;

    let service = DuelService::new(state.db.clone());
    let selector = ContentSelector::new(state.db.clone());
    let created = service
        .create_and_play(
            user_id,
            CreateDuelInput {
                challenged_id: req.challenged_id,
                difficulty_level: req.difficulty_level,
                challenger_score: req.challenger_score,
                challenger_time_taken: req.challenger_time_taken,
                challenger_answers: req.challenger_answers,
                questions: req.questions,
            },
            &selector,
        )
        .await?;

    let response = CreateDuelResponse {
        message: "Duel created and challenger's score recorded successfully".to_string(),
        duel_id: created.duel_id,
        challenger_score: created.challenger_score,
        difficulty_level: created.difficulty_level,
        questions: wrap(created.questions),
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// GET /api/duel/my-duels
pub async fn my_duels(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<DuelBuckets>>> {
    let user_id = require_user(&headers, &state).await?;

    let service = DuelService::new(state.db.clone());
    let buckets = service.list_for_user(user_id).await?;

    Ok(Json(ApiResponse::success(buckets)))
}

/// GET /api/duel/duel-questions/{duel_id}
pub async fn duel_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(duel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DuelQuestionsResponse>>> {
    let user_id = require_user(&headers, &state).await?;

    let service = DuelService::new(state.db.clone());
    let questions = service.get_questions(duel_id, user_id).await?;

    Ok(Json(ApiResponse::success(DuelQuestionsResponse {
        questions,
    })))
}

/// POST /api/duel/submit-duel-result/{duel_id}
pub async fn submit_duel_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(duel_id): Path<Uuid>,
    Json(req): Json<SubmitDuelResultRequest>,
) -> Result<Json<ApiResponse<DuelResultResponse>>> {
    let user_id = require_user(&headers, &state).await?;

    let service = DuelService::new(state.db.clone());
    let outcome = service
        .submit_result(
            duel_id,
            user_id,
            SubmitResultInput {
                score: req.score,
                time_taken: req.time_taken,
                answers: req.answers,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(DuelResultResponse {
        message: "Duel result submitted and duel completed".to_string(),
        duel_id: outcome.duel_id,
        your_score: outcome.your_score,
        challenger_score: outcome.challenger_score,
        winner_id: outcome.winner_id,
    })))
}

/// POST /api/duel/generate-questions
///
/// With a duel_id this returns that duel's pinned sequence; without one it
/// returns a preview draw that is NOT what a later create-duel will pin.
pub async fn generate_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<Json<ApiResponse<GenerateQuestionsResponse>>> {
    require_user(&headers, &state).await?;

    let difficulty_level = coerce_difficulty(req.difficulty_level.as_ref())?;

    if let Some(duel_id) = req.duel_id {
        let service = DuelService::new(state.db.clone());
        let pinned = service.pinned_questions(duel_id).await?;
        return Ok(Json(ApiResponse::success(GenerateQuestionsResponse {
            questions: wrap_pinned(pinned),
            warning: None,
        })));
    }

    let selector = ContentSelector::new(state.db.clone());
    let batch = selector
        .pick_batch(difficulty_level, crate::constants::DUEL_QUESTION_COUNT)
        .await?;
    if batch.len() < crate::constants::DUEL_QUESTION_COUNT {
        return Err(AppError::InsufficientContent(format!(
            "found {} of {} questions for difficulty level {}",
            batch.len(),
            crate::constants::DUEL_QUESTION_COUNT,
            difficulty_level
        )));
    }

    Ok(Json(ApiResponse::success(GenerateQuestionsResponse {
        questions: wrap(batch),
        warning: Some(
            "These are preview questions. Actual duel questions will be fixed when duel is created."
                .to_string(),
        ),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_accepts_number_and_numeric_string() {
        let n = serde_json::json!(3);
        assert_eq!(coerce_difficulty(Some(&n)).unwrap(), 3);

        let s = serde_json::json!("0");
        assert_eq!(coerce_difficulty(Some(&s)).unwrap(), 0);
    }

    #[test]
    fn difficulty_rejects_missing_and_out_of_range() {
        assert!(coerce_difficulty(None).is_err());
        assert!(coerce_difficulty(Some(&serde_json::json!(6))).is_err());
        assert!(coerce_difficulty(Some(&serde_json::json!("six"))).is_err());
        assert!(coerce_difficulty(Some(&serde_json::json!(true))).is_err());
    }

    #[test]
    fn pinned_questions_wrap_into_game_item_shape() {
        let pinned = vec![PinnedQuestion {
            duel_question_id: 11,
            game_item_id: 42,
            question_order: 1,
            game_type_id: 2,
            category_id: Some(3),
            level: 4,
            content: serde_json::json!({"en": "x"}),
        }];

        let wrapped = wrap_pinned(pinned);
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].game_item.id, 42);
        assert_eq!(wrapped[0].game_item.level, 4);
    }
}
