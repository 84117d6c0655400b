use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    config::Config,
    constants::{
        DUEL_STATUS_CHALLENGER_COMPLETED, FRIENDSHIP_STATUS_ACCEPTED, FRIENDSHIP_STATUS_PENDING,
    },
    error::Result,
    models::*,
};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Fields persisted when a duel is created together with the challenger's
/// first playthrough.
#[derive(Debug, Clone)]
pub struct NewDuel {
    pub id: Uuid,
    pub challenger_id: Uuid,
    pub challenged_id: Uuid,
    pub difficulty_level: i32,
    pub challenger_score: i32,
    pub challenger_time_taken: i32,
}

/// Fields persisted when the challenged player submits their result.
#[derive(Debug, Clone)]
pub struct DuelCompletion {
    pub challenged_score: i32,
    pub challenged_time_taken: i32,
    pub winner_id: Option<Uuid>,
}

// Store traits: the row-store collaborators the orchestration services are
// written against, so they can run over a fake in tests.

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_game_items(
        &self,
        category_id: Option<i64>,
        level: Option<i32>,
    ) -> Result<Vec<GameItem>>;
}

#[async_trait]
pub trait DuelStore: Send + Sync {
    /// Inserts the duel row and its pinned question sequence in one
    /// transaction; a failed question insert must not leave an orphaned duel.
    async fn create_duel_with_questions(&self, duel: &NewDuel, item_ids: &[i64]) -> Result<Uuid>;
    async fn get_duel(&self, duel_id: Uuid) -> Result<Option<Duel>>;
    async fn list_duels_for_user(&self, user_id: Uuid) -> Result<Vec<DuelListRow>>;
    async fn fetch_duel_questions(&self, duel_id: Uuid) -> Result<Vec<PinnedQuestion>>;
    /// Conditional on the duel still awaiting a result; returns false when
    /// another submission already completed it.
    async fn complete_duel(&self, duel_id: Uuid, completion: &DuelCompletion) -> Result<bool>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn category_id_by_slug(&self, slug: &str) -> Result<Option<i64>>;
    async fn upsert_category_progress(
        &self,
        user_id: Uuid,
        category_id: i64,
        language: Option<&str>,
        level: Option<i32>,
        points: i64,
    ) -> Result<()>;
    async fn recompute_total_score(&self, user_id: Uuid) -> Result<i64>;
    async fn evaluate_achievements(&self, user_id: Uuid) -> Result<()>;
    async fn raise_mixed_rush_highscore(&self, user_id: Uuid, score: i64) -> Result<()>;
}

// ==================== CONTENT QUERIES ====================
impl Database {
    pub async fn game_items(
        &self,
        category_id: Option<i64>,
        level: Option<i32>,
    ) -> Result<Vec<GameItem>> {
        const COLUMNS: &str = "id, game_type_id, category_id, level, content";

        let items = match (category_id, level) {
            (Some(category), Some(level)) => {
                sqlx::query_as::<_, GameItem>(&format!(
                    "SELECT {COLUMNS} FROM game_items WHERE category_id = $1 AND level = $2"
                ))
                .bind(category)
                .bind(level)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(category), None) => {
                sqlx::query_as::<_, GameItem>(&format!(
                    "SELECT {COLUMNS} FROM game_items WHERE category_id = $1"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(level)) => {
                sqlx::query_as::<_, GameItem>(&format!(
                    "SELECT {COLUMNS} FROM game_items WHERE level = $1"
                ))
                .bind(level)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query_as::<_, GameItem>(&format!("SELECT {COLUMNS} FROM game_items"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(items)
    }

    pub async fn game_type_id_by_slug(&self, slug: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM game_types WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn categories_by_game_type(&self, game_type_id: i64) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name FROM categories WHERE game_type_id = $1 ORDER BY name",
        )
        .bind(game_type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn insert_game_item(
        &self,
        game_type_id: i64,
        category_id: Option<i64>,
        level: i32,
        content: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO game_items (game_type_id, category_id, level, content)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(game_type_id)
        .bind(category_id)
        .bind(level)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// One random item across every game type, with its type slug.
    pub async fn random_game_item(&self) -> Result<Option<(String, serde_json::Value)>> {
        let row = sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT game_type, game_content FROM get_random_game_item()",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

// ==================== DUEL QUERIES ====================
impl Database {
    pub async fn insert_duel_with_questions(
        &self,
        duel: &NewDuel,
        item_ids: &[i64],
    ) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO duels (id, challenger_id, challenged_id, difficulty_level, status,
                                challenger_score, challenger_time_taken, challenger_completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())",
        )
        .bind(duel.id)
        .bind(duel.challenger_id)
        .bind(duel.challenged_id)
        .bind(duel.difficulty_level)
        .bind(DUEL_STATUS_CHALLENGER_COMPLETED)
        .bind(duel.challenger_score)
        .bind(duel.challenger_time_taken)
        .execute(&mut *tx)
        .await?;

        for (index, item_id) in item_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO duel_questions (duel_id, game_item_id, question_order)
                 VALUES ($1, $2, $3)",
            )
            .bind(duel.id)
            .bind(item_id)
            .bind((index + 1) as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(duel.id)
    }

    pub async fn duel_by_id(&self, duel_id: Uuid) -> Result<Option<Duel>> {
        let duel = sqlx::query_as::<_, Duel>("SELECT * FROM duels WHERE id = $1")
            .bind(duel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(duel)
    }

    pub async fn duels_for_user(&self, user_id: Uuid) -> Result<Vec<DuelListRow>> {
        let duels = sqlx::query_as::<_, DuelListRow>(
            "SELECT d.id, d.challenger_id, d.challenged_id, d.difficulty_level, d.status,
                    d.challenger_score, d.challenged_score, d.winner_id, d.created_at,
                    pc.username AS challenger_username, pc.avatar_url AS challenger_avatar_url,
                    pd.username AS challenged_username, pd.avatar_url AS challenged_avatar_url
             FROM duels d
             JOIN profiles pc ON pc.id = d.challenger_id
             JOIN profiles pd ON pd.id = d.challenged_id
             WHERE d.challenger_id = $1 OR d.challenged_id = $1
             ORDER BY d.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(duels)
    }

    pub async fn duel_questions(&self, duel_id: Uuid) -> Result<Vec<PinnedQuestion>> {
        let questions = sqlx::query_as::<_, PinnedQuestion>(
            "SELECT dq.id AS duel_question_id, dq.game_item_id, dq.question_order,
                    gi.game_type_id, gi.category_id, gi.level, gi.content
             FROM duel_questions dq
             JOIN game_items gi ON gi.id = dq.game_item_id
             WHERE dq.duel_id = $1
             ORDER BY dq.question_order ASC",
        )
        .bind(duel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn finish_duel(&self, duel_id: Uuid, completion: &DuelCompletion) -> Result<bool> {
        // The status predicate makes this a compare-and-set: of two racing
        // submissions only one can flip the row to completed.
        let result = sqlx::query(
            "UPDATE duels
             SET challenged_score = $1, challenged_time_taken = $2,
                 challenged_completed_at = NOW(), winner_id = $3, status = 'completed'
             WHERE id = $4 AND status = $5",
        )
        .bind(completion.challenged_score)
        .bind(completion.challenged_time_taken)
        .bind(completion.winner_id)
        .bind(duel_id)
        .bind(DUEL_STATUS_CHALLENGER_COMPLETED)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ==================== PROGRESS QUERIES ====================
impl Database {
    pub async fn find_category_id(&self, slug: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn add_category_progress(
        &self,
        user_id: Uuid,
        category_id: i64,
        language: Option<&str>,
        level: Option<i32>,
        points: i64,
    ) -> Result<()> {
        sqlx::query("SELECT upsert_category_progress($1, $2, $3, $4, $5)")
            .bind(user_id)
            .bind(category_id)
            .bind(language)
            .bind(level)
            .bind(points)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn recompute_total(&self, user_id: Uuid) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT recompute_total_score($1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn award_achievements(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("SELECT check_and_award_achievements_for_user($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_mixed_rush_highscore_if_greater(
        &self,
        user_id: Uuid,
        score: i64,
    ) -> Result<()> {
        sqlx::query("SELECT update_mixed_rush_highscore($1, $2)")
            .bind(user_id)
            .bind(score)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ==================== PROFILE QUERIES ====================
impl Database {
    pub async fn profile_by_id(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, username, avatar_url, total_score, mixed_rush_highscore, created_at
             FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn profile_id_by_username(&self, username: &str) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn category_progress_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CategoryProgressRow>> {
        let rows = sqlx::query_as::<_, CategoryProgressRow>(
            "SELECT ulp.category_id, c.slug AS category_slug, ulp.language, ulp.level, ulp.score
             FROM user_level_progress ulp
             JOIN categories c ON c.id = ulp.category_id
             WHERE ulp.user_id = $1
             ORDER BY c.slug, ulp.language, ulp.level",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn earned_achievements(&self, user_id: Uuid) -> Result<Vec<EarnedAchievement>> {
        let rows = sqlx::query_as::<_, EarnedAchievement>(
            "SELECT ua.earned_at, a.slug, a.name, a.description, a.icon_url
             FROM user_achievements ua
             JOIN achievements a ON a.id = ua.achievement_id
             WHERE ua.user_id = $1
             ORDER BY ua.earned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ==================== SOCIAL QUERIES ====================
impl Database {
    pub async fn friendships_for(&self, user_id: Uuid) -> Result<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, Friendship>(
            "SELECT id, user1_id, user2_id, status, created_at
             FROM friendships
             WHERE user1_id = $1 OR user2_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PublicProfile>> {
        let rows = sqlx::query_as::<_, PublicProfile>(
            "SELECT id, username, avatar_url FROM profiles WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Checks both directions: a pending or accepted row in either
    /// orientation counts as an existing relation.
    pub async fn friendship_exists(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM friendships
                 WHERE (user1_id = $1 AND user2_id = $2)
                    OR (user1_id = $2 AND user2_id = $1)
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn insert_friend_request(&self, sender: Uuid, receiver: Uuid) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO friendships (user1_id, user2_id, status)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(sender)
        .bind(receiver)
        .bind(FRIENDSHIP_STATUS_PENDING)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Only the receiver of a still-pending request may accept it.
    pub async fn accept_friend_request(&self, friendship_id: i64, receiver: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE friendships SET status = $1
             WHERE id = $2 AND user2_id = $3 AND status = $4",
        )
        .bind(FRIENDSHIP_STATUS_ACCEPTED)
        .bind(friendship_id)
        .bind(receiver)
        .bind(FRIENDSHIP_STATUS_PENDING)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Either party may remove the row, whether pending or accepted.
    pub async fn delete_friendship(&self, friendship_id: i64, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM friendships
             WHERE id = $1 AND (user1_id = $2 OR user2_id = $2)",
        )
        .bind(friendship_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn search_profiles(
        &self,
        query: &str,
        searcher: Uuid,
        limit: i64,
    ) -> Result<Vec<PublicProfile>> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, PublicProfile>(
            "SELECT id, username, avatar_url
             FROM profiles
             WHERE username ILIKE $1
               AND id <> $2
               AND id NOT IN (
                   SELECT user2_id FROM friendships WHERE user1_id = $2
                   UNION
                   SELECT user1_id FROM friendships WHERE user2_id = $2
               )
             ORDER BY username
             LIMIT $3",
        )
        .bind(pattern)
        .bind(searcher)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ==================== STORE TRAIT IMPLS ====================

#[async_trait]
impl ContentStore for Database {
    async fn fetch_game_items(
        &self,
        category_id: Option<i64>,
        level: Option<i32>,
    ) -> Result<Vec<GameItem>> {
        self.game_items(category_id, level).await
    }
}

#[async_trait]
impl DuelStore for Database {
    async fn create_duel_with_questions(&self, duel: &NewDuel, item_ids: &[i64]) -> Result<Uuid> {
        self.insert_duel_with_questions(duel, item_ids).await
    }

    async fn get_duel(&self, duel_id: Uuid) -> Result<Option<Duel>> {
        self.duel_by_id(duel_id).await
    }

    async fn list_duels_for_user(&self, user_id: Uuid) -> Result<Vec<DuelListRow>> {
        self.duels_for_user(user_id).await
    }

    async fn fetch_duel_questions(&self, duel_id: Uuid) -> Result<Vec<PinnedQuestion>> {
        self.duel_questions(duel_id).await
    }

    async fn complete_duel(&self, duel_id: Uuid, completion: &DuelCompletion) -> Result<bool> {
        self.finish_duel(duel_id, completion).await
    }
}

#[async_trait]
impl ProgressStore for Database {
    async fn category_id_by_slug(&self, slug: &str) -> Result<Option<i64>> {
        self.find_category_id(slug).await
    }

    async fn upsert_category_progress(
        &self,
        user_id: Uuid,
        category_id: i64,
        language: Option<&str>,
        level: Option<i32>,
        points: i64,
    ) -> Result<()> {
        self.add_category_progress(user_id, category_id, language, level, points)
            .await
    }

    async fn recompute_total_score(&self, user_id: Uuid) -> Result<i64> {
        self.recompute_total(user_id).await
    }

    async fn evaluate_achievements(&self, user_id: Uuid) -> Result<()> {
        self.award_achievements(user_id).await
    }

    async fn raise_mixed_rush_highscore(&self, user_id: Uuid, score: i64) -> Result<()> {
        self.set_mixed_rush_highscore_if_greater(user_id, score).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[tokio::test]
    async fn database_new_returns_error_on_invalid_url() {
        let mut config = test_config();
        config.database_url = "not-a-url".to_string();
        let result = Database::new(&config).await;
        assert!(result.is_err());
    }
}
