use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ==================== PROFILES ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub total_score: i64,
    pub mixed_rush_highscore: i64,
    pub created_at: DateTime<Utc>,
}

/// Subset of a profile exposed to other players.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

// ==================== CONTENT ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// One question/prompt. `content` is the per-language JSONB payload; its
/// shape depends on the owning game type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameItem {
    pub id: i64,
    pub game_type_id: i64,
    pub category_id: Option<i64>,
    pub level: i32,
    pub content: serde_json::Value,
}

/// A question as submitted by a client on duel creation. Older clients send
/// the item nested under a `game_item` key, newer ones send it flat; both
/// normalize to the same [`GameItem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmittedQuestion {
    Wrapped { game_item: GameItem },
    Flat(GameItem),
}

impl SubmittedQuestion {
    pub fn into_item(self) -> GameItem {
        match self {
            SubmittedQuestion::Wrapped { game_item } => game_item,
            SubmittedQuestion::Flat(item) => item,
        }
    }
}

// ==================== DUELS ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Duel {
    pub id: Uuid,
    pub challenger_id: Uuid,
    pub challenged_id: Uuid,
    pub difficulty_level: i32,
    pub status: String,
    pub challenger_score: Option<i32>,
    pub challenger_time_taken: Option<i32>,
    pub challenger_completed_at: Option<DateTime<Utc>>,
    pub challenged_score: Option<i32>,
    pub challenged_time_taken: Option<i32>,
    pub challenged_completed_at: Option<DateTime<Utc>>,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Duel row joined with both parties' display data, as listed on my-duels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DuelListRow {
    pub id: Uuid,
    pub challenger_id: Uuid,
    pub challenged_id: Uuid,
    pub difficulty_level: i32,
    pub status: String,
    pub challenger_score: Option<i32>,
    pub challenged_score: Option<i32>,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub challenger_username: String,
    pub challenger_avatar_url: Option<String>,
    pub challenged_username: String,
    pub challenged_avatar_url: Option<String>,
}

/// One entry of a duel's pinned question sequence, ready for the client.
/// Carries no answer key beyond the content payload itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PinnedQuestion {
    pub duel_question_id: i64,
    pub game_item_id: i64,
    pub question_order: i32,
    pub game_type_id: i64,
    pub category_id: Option<i64>,
    pub level: i32,
    pub content: serde_json::Value,
}

// ==================== PROGRESS & ACHIEVEMENTS ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryProgressRow {
    pub category_id: i64,
    pub category_slug: String,
    pub language: String,
    pub level: i32,
    pub score: i64,
}

/// Catalog fields joined onto a user's earned row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EarnedAchievement {
    pub earned_at: DateTime<Utc>,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
}

// ==================== SOCIAL ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Friendship {
    pub id: i64,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// ==================== API ENVELOPE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }

    #[test]
    fn submitted_question_normalizes_flat_shape() {
        let raw = serde_json::json!({
            "id": 7,
            "game_type_id": 1,
            "category_id": 3,
            "level": 2,
            "content": {"en": "The cat sat"}
        });
        let q: SubmittedQuestion = serde_json::from_value(raw).unwrap();
        let item = q.into_item();
        assert_eq!(item.id, 7);
        assert_eq!(item.level, 2);
    }

    #[test]
    fn submitted_question_normalizes_wrapped_shape() {
        let raw = serde_json::json!({
            "game_item": {
                "id": 9,
                "game_type_id": 2,
                "category_id": null,
                "level": 4,
                "content": {"en": "blank"}
            }
        });
        let q: SubmittedQuestion = serde_json::from_value(raw).unwrap();
        let item = q.into_item();
        assert_eq!(item.id, 9);
        assert_eq!(item.category_id, None);
    }
}
