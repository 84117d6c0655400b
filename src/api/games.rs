use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::DEFAULT_LANGUAGE,
    error::{AppError, Result},
    models::{ApiResponse, Category},
    services::{content_selector, ContentSelector},
};

use super::AppState;

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct GameQuery {
    pub lang: Option<String>,
    pub level: Option<i32>,
    pub category: Option<String>,
    /// Comma-separated item ids the client has already seen this session.
    pub exclude: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SentenceScrambleGame {
    pub shuffled_words: Vec<String>,
    pub correct_sentence: String,
}

#[derive(Debug, Serialize)]
pub struct ImageMatchGame {
    pub image_url: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct FillInTheBlankGame {
    pub sentence_parts: serde_json::Value,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSentenceScrambleRequest {
    pub en: Option<String>,
    pub tr: Option<String>,
    pub ja: Option<String>,
    pub level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AddImageMatchRequest {
    pub image_url: Option<String>,
    pub options: Option<serde_json::Value>,
    pub answer: Option<serde_json::Value>,
    pub level: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MixedRushQuestion {
    #[serde(rename = "type")]
    pub game_type: String,
    pub data: serde_json::Value,
}

// ==================== HELPERS ====================

pub fn parse_exclude_ids(raw: Option<&str>) -> Vec<i64> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    })
    .unwrap_or_default()
}

fn lang_string(content: &serde_json::Value, key: &str, lang: &str) -> Option<String> {
    content
        .get(key)?
        .get(lang)?
        .as_str()
        .map(|s| s.to_string())
}

fn lang_options(content: &serde_json::Value, lang: &str) -> Option<Vec<String>> {
    let options = content.get("options")?.get(lang)?.as_array()?;
    options
        .iter()
        .map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}

async fn resolve_category(state: &AppState, query: &GameQuery) -> Result<i64> {
    let slug = query
        .category
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Category slug is required.".to_string()))?;

    state
        .db
        .find_category_id(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category '{slug}' not found.")))
}

async fn pick_content(
    state: &AppState,
    query: &GameQuery,
) -> Result<serde_json::Value> {
    let category_id = resolve_category(state, query).await?;
    let level = query.level.unwrap_or(1);
    let exclude = parse_exclude_ids(query.exclude.as_deref());

    let selector = ContentSelector::new(state.db.clone());
    let item = selector
        .pick_one(category_id, level, &exclude)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No game content found for this category".to_string())
        })?;

    Ok(item.content)
}

// ==================== HANDLERS ====================

/// GET /api/games/sentence-scramble
pub async fn sentence_scramble(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<ApiResponse<SentenceScrambleGame>>> {
    let lang = query.lang.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let content = pick_content(&state, &query).await?;

    let correct_sentence = content
        .get(&lang)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::NotFound(format!("Content for language '{lang}' not found"))
        })?;

    let mut shuffled_words: Vec<String> = correct_sentence
        .split_whitespace()
        .map(|w| w.to_string())
        .collect();
    content_selector::shuffle(&mut shuffled_words);

    Ok(Json(ApiResponse::success(SentenceScrambleGame {
        shuffled_words,
        correct_sentence,
    })))
}

/// POST /api/games/sentence-scramble
pub async fn add_sentence_scramble(
    State(state): State<AppState>,
    Json(req): Json<AddSentenceScrambleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<String>>)> {
    let (en, tr, ja) = match (&req.en, &req.tr, &req.ja) {
        (Some(en), Some(tr), Some(ja)) => (en, tr, ja),
        _ => {
            return Err(AppError::BadRequest(
                "Missing required language fields: en, tr, ja".to_string(),
            ))
        }
    };

    let game_type_id = state
        .db
        .game_type_id_by_slug("sentence-scramble")
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Game type 'sentence-scramble' not found.".to_string())
        })?;

    let content = serde_json::json!({ "en": en, "tr": tr, "ja": ja });
    state
        .db
        .insert_game_item(game_type_id, None, req.level.unwrap_or(1), &content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Sentence Scramble game added successfully!".to_string(),
        )),
    ))
}

/// GET /api/games/image-match
pub async fn image_match(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<ApiResponse<ImageMatchGame>>> {
    let lang = query.lang.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let content = pick_content(&state, &query).await?;

    let image_url = content
        .get("image_url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let options = lang_options(&content, &lang);
    let answer = lang_string(&content, "answer", &lang);

    let (image_url, mut options, answer) = match (image_url, options, answer) {
        (Some(i), Some(o), Some(a)) => (i, o, a),
        _ => {
            return Err(AppError::NotFound(format!(
                "Content for language '{lang}' is incomplete for the selected game item."
            )))
        }
    };

    content_selector::shuffle(&mut options);

    Ok(Json(ApiResponse::success(ImageMatchGame {
        image_url,
        options,
        answer,
    })))
}

/// POST /api/games/image-match
pub async fn add_image_match(
    State(state): State<AppState>,
    Json(req): Json<AddImageMatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<String>>)> {
    let (image_url, options, answer) = match (&req.image_url, &req.options, &req.answer) {
        (Some(i), Some(o), Some(a)) => (i, o, a),
        _ => {
            return Err(AppError::BadRequest(
                "Missing required fields: image_url, options, answer".to_string(),
            ))
        }
    };

    let game_type_id = state
        .db
        .game_type_id_by_slug("image-match")
        .await?
        .ok_or_else(|| AppError::NotFound("Game type 'image-match' not found.".to_string()))?;

    let content = serde_json::json!({
        "image_url": image_url,
        "options": options,
        "answer": answer,
    });
    state
        .db
        .insert_game_item(game_type_id, None, req.level.unwrap_or(1), &content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Image Match game added successfully!".to_string(),
        )),
    ))
}

/// GET /api/games/fill-in-the-blank
pub async fn fill_in_the_blank(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<ApiResponse<FillInTheBlankGame>>> {
    let lang = query.lang.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let content = pick_content(&state, &query).await?;

    let sentence_parts = content
        .get("sentence_parts")
        .and_then(|v| v.get(&lang))
        .cloned();
    let options = lang_options(&content, &lang);
    let answer = lang_string(&content, "answer", &lang);

    let (sentence_parts, mut options, answer) = match (sentence_parts, options, answer) {
        (Some(s), Some(o), Some(a)) => (s, o, a),
        _ => {
            return Err(AppError::NotFound(format!(
                "Content for language '{lang}' is incomplete"
            )))
        }
    };

    content_selector::shuffle(&mut options);

    Ok(Json(ApiResponse::success(FillInTheBlankGame {
        sentence_parts,
        options,
        answer,
    })))
}

/// GET /api/games/{game_slug}/categories
pub async fn categories_for_game(
    State(state): State<AppState>,
    Path(game_slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<Category>>>> {
    let game_type_id = state
        .db
        .game_type_id_by_slug(&game_slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Game type '{game_slug}' not found.")))?;

    let categories = state.db.categories_by_game_type(game_type_id).await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// GET /api/games/mixed-rush/random-question
///
/// One random item of any game type, reshaped into the same payload the
/// dedicated endpoint for that type would serve.
pub async fn mixed_rush_question(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<ApiResponse<MixedRushQuestion>>> {
    let lang = query.lang.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let (game_type, content) = state.db.random_game_item().await?.ok_or_else(|| {
        AppError::NotFound("No game items found in the database.".to_string())
    })?;

    let data = match game_type.as_str() {
        "sentence-scramble" => {
            let correct_sentence = content
                .get(&lang)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    AppError::NotFound(format!("Content for language '{lang}' not found"))
                })?;
            let mut shuffled_words: Vec<String> = correct_sentence
                .split_whitespace()
                .map(|w| w.to_string())
                .collect();
            content_selector::shuffle(&mut shuffled_words);
            serde_json::json!({
                "shuffled_words": shuffled_words,
                "correct_sentence": correct_sentence,
            })
        }
        "image-match" => {
            let mut options = lang_options(&content, &lang).ok_or_else(|| {
                AppError::NotFound(format!("Content for language '{lang}' not found"))
            })?;
            content_selector::shuffle(&mut options);
            serde_json::json!({
                "image_url": content.get("image_url").cloned().unwrap_or_default(),
                "options": options,
                "answer": content.get("answer").and_then(|a| a.get(&lang)).cloned(),
            })
        }
        "fill-in-the-blank" => {
            let mut options = lang_options(&content, &lang).ok_or_else(|| {
                AppError::NotFound(format!("Content for language '{lang}' not found"))
            })?;
            content_selector::shuffle(&mut options);
            serde_json::json!({
                "sentence_parts": content.get("sentence_parts").and_then(|p| p.get(&lang)).cloned(),
                "options": options,
                "answer": content.get("answer").and_then(|a| a.get(&lang)).cloned(),
            })
        }
        _ => content,
    };

    Ok(Json(ApiResponse::success(MixedRushQuestion {
        game_type,
        data,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_ids_parse_and_skip_garbage() {
        assert_eq!(parse_exclude_ids(Some("1,2,3")), vec![1, 2, 3]);
        assert_eq!(parse_exclude_ids(Some(" 4 , x, 5 ")), vec![4, 5]);
        assert!(parse_exclude_ids(Some("")).is_empty());
        assert!(parse_exclude_ids(None).is_empty());
    }

    #[test]
    fn lang_options_requires_string_array() {
        let content = serde_json::json!({
            "options": { "en": ["a", "b"], "tr": "not-an-array" }
        });
        assert_eq!(
            lang_options(&content, "en"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(lang_options(&content, "tr"), None);
        assert_eq!(lang_options(&content, "ja"), None);
    }

    #[test]
    fn lang_string_reads_nested_key() {
        let content = serde_json::json!({ "answer": { "en": "cat" } });
        assert_eq!(lang_string(&content, "answer", "en"), Some("cat".into()));
        assert_eq!(lang_string(&content, "answer", "ja"), None);
    }
}
