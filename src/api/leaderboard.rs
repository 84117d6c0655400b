use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    constants::{LEADERBOARD_DEFAULT_LIMIT, LEADERBOARD_MAX_LIMIT},
    error::Result,
    models::ApiResponse,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardRow {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub row: LeaderboardRow,
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(LEADERBOARD_DEFAULT_LIMIT)
        .clamp(1, LEADERBOARD_MAX_LIMIT)
}

fn ranked(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry { rank: i + 1, row })
        .collect()
}

/// GET /api/leaderboard/total-score
pub async fn total_score(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let rows = sqlx::query_as::<_, LeaderboardRow>(
        "SELECT id, username, avatar_url, COALESCE(total_score, 0) AS score
         FROM profiles
         ORDER BY total_score DESC NULLS LAST, username
         LIMIT $1",
    )
    .bind(clamp_limit(query.limit))
    .fetch_all(state.db.pool())
    .await?;

    Ok(Json(ApiResponse::success(ranked(rows))))
}

/// GET /api/leaderboard/mixed-rush
pub async fn mixed_rush(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let rows = sqlx::query_as::<_, LeaderboardRow>(
        "SELECT id, username, avatar_url, COALESCE(mixed_rush_highscore, 0) AS score
         FROM profiles
         ORDER BY mixed_rush_highscore DESC NULLS LAST, username
         LIMIT $1",
    )
    .bind(clamp_limit(query.limit))
    .fetch_all(state.db.pool())
    .await?;

    Ok(Json(ApiResponse::success(ranked(rows))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), LEADERBOARD_DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), LEADERBOARD_MAX_LIMIT);
    }
}
