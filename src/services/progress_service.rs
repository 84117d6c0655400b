use uuid::Uuid;

use crate::{
    constants::{
        POINTS_LEVEL_1, POINTS_LEVEL_2, POINTS_LEVEL_3, POINTS_LEVEL_4, POINTS_LEVEL_5,
    },
    db::ProgressStore,
    error::{AppError, Result},
};

/// Points awarded for clearing one round at a given difficulty level.
pub fn points_for_level(level: i32) -> Option<i64> {
    match level {
        1 => Some(POINTS_LEVEL_1),
        2 => Some(POINTS_LEVEL_2),
        3 => Some(POINTS_LEVEL_3),
        4 => Some(POINTS_LEVEL_4),
        5 => Some(POINTS_LEVEL_5),
        _ => None,
    }
}

#[derive(Debug)]
pub struct SubmitScoreInput {
    pub category_slug: Option<String>,
    pub level: Option<i32>,
    pub language: Option<String>,
    pub points: Option<i64>,
}

/// Runs the scoring cascade: category progress, total recompute, achievement
/// evaluation. The three effects have no shared transaction; only the first
/// is load-bearing, the recompute is a from-scratch write that self-corrects
/// on the next submission if a later step fails.
pub struct ProgressService<S> {
    store: S,
}

impl<S: ProgressStore> ProgressService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn submit_score(&self, user_id: Uuid, input: SubmitScoreInput) -> Result<()> {
        let slug = input
            .category_slug
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("categorySlug is required".to_string()))?;
        let level = input
            .level
            .ok_or_else(|| AppError::BadRequest("level is required".to_string()))?;

        let points = match input.points {
            Some(override_points) => override_points,
            None => points_for_level(level).ok_or_else(|| {
                AppError::BadRequest("Invalid difficulty level. Must be 1-5.".to_string())
            })?,
        };

        let category_id = self
            .store
            .category_id_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{slug}' not found")))?;

        // Step 1 is the primary effect; its failure is the caller's problem.
        self.store
            .upsert_category_progress(
                user_id,
                category_id,
                input.language.as_deref(),
                Some(level),
                points,
            )
            .await?;

        // Steps 2 and 3 are best-effort. The recompute is idempotent, so a
        // miss here is healed by any later submission.
        if let Err(e) = self.store.recompute_total_score(user_id).await {
            tracing::warn!(%user_id, "total score recompute failed: {e}");
        }
        if let Err(e) = self.store.evaluate_achievements(user_id).await {
            tracing::warn!(%user_id, "achievement evaluation failed: {e}");
        }

        Ok(())
    }

    pub async fn submit_mixed_rush_final(&self, user_id: Uuid, score: Option<i64>) -> Result<()> {
        let score =
            score.ok_or_else(|| AppError::BadRequest("score is required".to_string()))?;
        if score < 0 {
            return Err(AppError::BadRequest(
                "score must be non-negative".to_string(),
            ));
        }

        self.store.raise_mixed_rush_highscore(user_id, score).await?;

        if let Err(e) = self.store.evaluate_achievements(user_id).await {
            tracing::warn!(%user_id, "achievement evaluation failed: {e}");
        }

        Ok(())
    }
}
