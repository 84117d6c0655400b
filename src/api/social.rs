use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    constants::{FRIENDSHIP_STATUS_ACCEPTED, FRIENDSHIP_STATUS_PENDING, USER_SEARCH_LIMIT},
    error::{AppError, Result},
    models::{ApiResponse, Friendship, PublicProfile},
};

use super::{require_user, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Serialize)]
pub struct IncomingRequest {
    pub friendship_id: i64,
    #[serde(flatten)]
    pub sender: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<PublicProfile>,
    pub incoming_requests: Vec<IncomingRequest>,
    pub sent_requests: Vec<PublicProfile>,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub receiver_id: Option<Uuid>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FriendshipActionBody {
    pub friendship_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SocialMessage {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

// ==================== HELPERS ====================

/// Splits a user's friendship rows into accepted friends, requests awaiting
/// their answer, and requests they have sent. Returns the other party's id
/// in each bucket; incoming keeps the row id so the client can accept it.
pub fn partition_friendships(
    user_id: Uuid,
    rows: &[Friendship],
) -> (Vec<Uuid>, Vec<(i64, Uuid)>, Vec<Uuid>) {
    let mut friends = Vec::new();
    let mut incoming = Vec::new();
    let mut sent = Vec::new();

    for row in rows {
        let other = if row.user1_id == user_id {
            row.user2_id
        } else {
            row.user1_id
        };

        if row.status == FRIENDSHIP_STATUS_ACCEPTED {
            friends.push(other);
        } else if row.status == FRIENDSHIP_STATUS_PENDING {
            if row.user2_id == user_id {
                incoming.push((row.id, other));
            } else {
                sent.push(other);
            }
        }
    }

    (friends, incoming, sent)
}

// ==================== HANDLERS ====================

/// GET /api/social/friends
pub async fn list_friends(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<FriendsResponse>>> {
    let user_id = require_user(&headers, &state).await?;

    let rows = state.db.friendships_for(user_id).await?;
    let (friend_ids, incoming, sent_ids) = partition_friendships(user_id, &rows);

    let mut all_ids: Vec<Uuid> = friend_ids.clone();
    all_ids.extend(incoming.iter().map(|(_, sender)| *sender));
    all_ids.extend(sent_ids.iter().copied());

    let profiles: HashMap<Uuid, PublicProfile> = state
        .db
        .profiles_by_ids(&all_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let friends = friend_ids
        .iter()
        .filter_map(|id| profiles.get(id).cloned())
        .collect();
    let incoming_requests = incoming
        .iter()
        .filter_map(|(friendship_id, sender_id)| {
            profiles.get(sender_id).cloned().map(|sender| IncomingRequest {
                friendship_id: *friendship_id,
                sender,
            })
        })
        .collect();
    let sent_requests = sent_ids
        .iter()
        .filter_map(|id| profiles.get(id).cloned())
        .collect();

    Ok(Json(ApiResponse::success(FriendsResponse {
        friends,
        incoming_requests,
        sent_requests,
    })))
}

/// POST /api/social/friends/request
pub async fn send_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FriendRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<SocialMessage>>)> {
    let user_id = require_user(&headers, &state).await?;

    let receiver_id = match (body.receiver_id, body.username.as_deref()) {
        (Some(id), _) => id,
        (None, Some(username)) => state
            .db
            .profile_id_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "receiver_id or username is required".to_string(),
            ))
        }
    };

    if receiver_id == user_id {
        return Err(AppError::BadRequest(
            "You cannot send a friend request to yourself".to_string(),
        ));
    }

    if state.db.profile_by_id(receiver_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if state.db.friendship_exists(user_id, receiver_id).await? {
        return Err(AppError::Conflict(
            "A friendship or pending request already exists between these users".to_string(),
        ));
    }

    state.db.insert_friend_request(user_id, receiver_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SocialMessage {
            message: "Friend request sent".to_string(),
        })),
    ))
}

/// POST /api/social/friends/accept
pub async fn accept_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FriendshipActionBody>,
) -> Result<Json<ApiResponse<SocialMessage>>> {
    let user_id = require_user(&headers, &state).await?;

    let friendship_id = body
        .friendship_id
        .ok_or_else(|| AppError::BadRequest("friendship_id is required".to_string()))?;

    let accepted = state.db.accept_friend_request(friendship_id, user_id).await?;
    if !accepted {
        return Err(AppError::NotFound(
            "Friend request not found or not addressed to you".to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(SocialMessage {
        message: "Friend request accepted".to_string(),
    })))
}

/// POST /api/social/friends/reject
///
/// Also used to cancel a request the caller sent, and to unfriend.
pub async fn reject_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FriendshipActionBody>,
) -> Result<Json<ApiResponse<SocialMessage>>> {
    let user_id = require_user(&headers, &state).await?;

    let friendship_id = body
        .friendship_id
        .ok_or_else(|| AppError::BadRequest("friendship_id is required".to_string()))?;

    let deleted = state.db.delete_friendship(friendship_id, user_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Friendship not found".to_string()));
    }

    Ok(Json(ApiResponse::success(SocialMessage {
        message: "Friendship removed".to_string(),
    })))
}

/// GET /api/social/users/search
pub async fn search_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<PublicProfile>>>> {
    let user_id = require_user(&headers, &state).await?;

    let term = query.query.as_deref().map(str::trim).unwrap_or_default();
    if term.len() < 2 {
        return Err(AppError::BadRequest(
            "Search query must be at least 2 characters".to_string(),
        ));
    }

    let results = state
        .db
        .search_profiles(term, user_id, USER_SEARCH_LIMIT)
        .await?;

    Ok(Json(ApiResponse::success(results)))
}
