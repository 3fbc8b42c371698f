//! Thought feed endpoints: reverse-chronological listing with cursor
//! pagination, authenticated posting, and owner-scoped editing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::moderation::contains_hate_speech;
use crate::storage::{NewThought, Thought};
use crate::AppState;

use super::session_user;

const DEFAULT_PAGE: i64 = 30;
const MAX_PAGE: i64 = 100;
const MAX_CONTENT_LEN: usize = 2000;

const VALID_FONTS: &[&str] = &["sans-serif", "serif", "mono"];
const VALID_CATEGORIES: &[&str] = &["thought", "diary", "aspiration"];
const VALID_COLORS: &[&str] = &["default", "rose", "amber", "emerald", "sky", "violet"];

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Cursor: return thoughts with an id strictly below this.
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateThought {
    pub content: String,
    pub font: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditThought {
    pub content: String,
}

/// Trim and bound the content, rejecting blacklisted language.
fn validate_content(content: &str) -> AppResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(
            "Content must be 1-2000 characters".into(),
        ));
    }
    if contains_hate_speech(trimmed) {
        return Err(AppError::Validation("Content not allowed".into()));
    }
    Ok(trimmed)
}

/// Unknown style values fall back to defaults rather than rejecting the post.
fn sanitize<'a>(value: Option<&'a str>, allowed: &[&str], fallback: &'a str) -> &'a str {
    match value {
        Some(v) if allowed.contains(&v) => v,
        _ => fallback,
    }
}

pub async fn list_thoughts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<Thought>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);

    let thoughts = match query.before {
        Some(before) => state.storage.thoughts_before(before, limit).await?,
        None => state.storage.latest_thoughts(limit).await?,
    };

    Ok(Json(thoughts))
}

pub async fn create_thought(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CreateThought>,
) -> AppResult<Json<Thought>> {
    let user_id = session_user(&state, &jar).ok_or(AppError::Unauthorized)?;

    let content = validate_content(&body.content)?;
    let thought = state
        .storage
        .create_thought(NewThought {
            content,
            font: sanitize(body.font.as_deref(), VALID_FONTS, "sans-serif"),
            category: sanitize(body.category.as_deref(), VALID_CATEGORIES, "thought"),
            color: sanitize(body.color.as_deref(), VALID_COLORS, "default"),
            user_id: &user_id,
        })
        .await?;

    Ok(Json(thought))
}

pub async fn update_thought(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Json(body): Json<EditThought>,
) -> AppResult<Json<Thought>> {
    let user_id = session_user(&state, &jar).ok_or(AppError::Unauthorized)?;

    let content = validate_content(&body.content)?;
    let thought = state
        .storage
        .update_thought(id, content, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Thought not found".into()))?;

    Ok(Json(thought))
}
