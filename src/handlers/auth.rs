//! Ceremony endpoints
//!
//! Four POST endpoints, JSON in/out plus two cookies: `challenge_session`
//! correlates a client to its pending challenge row for five minutes, and
//! `session` carries the signed identity token for thirty days. Both are
//! httpOnly, lax same-site, path `/`, and `secure` in production.

use axum::{extract::State, http::HeaderMap, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use webauthn_rs::prelude::{PublicKeyCredential, RegisterPublicKeyCredential};

use crate::ceremony::{authentication, registration, CHALLENGE_TTL_SECS};
use crate::error::{AppError, AppResult};
use crate::session::SESSION_TTL_DAYS;
use crate::AppState;

use super::check_rate_limit;

pub const CHALLENGE_COOKIE: &str = "challenge_session";
pub const SESSION_COOKIE: &str = "session";

fn challenge_cookie(state: &AppState, session_id: String) -> Cookie<'static> {
    Cookie::build((CHALLENGE_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(CHALLENGE_TTL_SECS))
        .secure(state.config.production)
        .build()
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .secure(state.config.production)
        .build()
}

fn clear_challenge_cookie() -> Cookie<'static> {
    Cookie::build((CHALLENGE_COOKIE, ""))
        .path("/")
        .build()
}

fn pending_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(CHALLENGE_COOKIE).map(|c| c.value().to_string())
}

pub async fn register_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    check_rate_limit(&state, &headers).await?;

    let begin = registration::begin(&state, pending_session_id(&jar)).await?;

    let jar = jar.add(challenge_cookie(&state, begin.session_id));
    Ok((jar, Json(json!(begin.options))))
}

pub async fn register_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> AppResult<(CookieJar, Json<Value>)> {
    check_rate_limit(&state, &headers).await?;

    let session_id = pending_session_id(&jar)
        .ok_or_else(|| AppError::Sequence("No challenge session".into()))?;

    let credential: RegisterPublicKeyCredential = serde_json::from_value(body)
        .map_err(|_| AppError::Validation("Malformed credential".into()))?;

    let user_id = registration::complete(&state, &session_id, &credential).await?;

    let token = state
        .sessions
        .issue(&user_id)
        .map_err(|e| AppError::Internal(format!("issue session: {e}")))?;

    let jar = jar
        .add(session_cookie(&state, token))
        .remove(clear_challenge_cookie());
    Ok((jar, Json(json!({ "verified": true }))))
}

pub async fn login_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    check_rate_limit(&state, &headers).await?;

    let begin = authentication::begin(&state, pending_session_id(&jar)).await?;

    let jar = jar.add(challenge_cookie(&state, begin.session_id));
    Ok((jar, Json(json!(begin.options))))
}

pub async fn login_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> AppResult<(CookieJar, Json<Value>)> {
    check_rate_limit(&state, &headers).await?;

    let session_id = pending_session_id(&jar)
        .ok_or_else(|| AppError::Sequence("No challenge session".into()))?;

    let credential: PublicKeyCredential = serde_json::from_value(body)
        .map_err(|_| AppError::Validation("Malformed credential".into()))?;

    let user_id = authentication::complete(&state, &session_id, &credential).await?;

    let token = state
        .sessions
        .issue(&user_id)
        .map_err(|e| AppError::Internal(format!("issue session: {e}")))?;

    let jar = jar
        .add(session_cookie(&state, token))
        .remove(clear_challenge_cookie());
    Ok((jar, Json(json!({ "verified": true }))))
}
