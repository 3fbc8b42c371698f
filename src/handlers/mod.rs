//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod thoughts;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Client identifier for rate limiting: first hop of `x-forwarded-for`, then
/// `x-real-ip`, else a shared bucket. Good enough for coarse abuse
/// mitigation behind a proxy.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            return value.to_string();
        }
    }

    "unknown".to_string()
}

/// Gate a ceremony endpoint on the per-ip fixed window.
pub(crate) async fn check_rate_limit(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let key = format!("auth:{}", client_ip(headers));
    let decision = state
        .limiter
        .check(&key, state.config.rate_limit_max, state.config.rate_limit_window)
        .await;

    if !decision.ok {
        return Err(AppError::RateLimited {
            retry_after: decision.retry_after,
        });
    }

    Ok(())
}

/// Resolve the authenticated user from the `session` cookie, if any.
pub(crate) fn session_user(state: &AppState, jar: &CookieJar) -> Option<String> {
    let token = jar.get(auth::SESSION_COOKIE)?.value();
    state.sessions.verify(token).ok()
}
