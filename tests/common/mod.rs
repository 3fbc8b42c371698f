//! Shared helpers for router-level tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum::Router;
use restspace::storage;
use restspace::web::create_router;
use restspace::{AppState, Config, RateLimiter, SessionIssuer};
use webauthn_rs::prelude::{Url, WebauthnBuilder};

pub fn test_config(rate_limit_max: u32) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        rp_id: "localhost".to_string(),
        rp_origin: "http://localhost:8080".to_string(),
        rp_name: "restspace".to_string(),
        session_secret: "test_secret_key_for_testing_only_32_chars_long".to_string(),
        production: false,
        rate_limit_max,
        rate_limit_window: Duration::from_secs(60),
    }
}

/// In-memory application state plus its router. The state handle lets tests
/// inspect storage behind the endpoints.
pub async fn test_app(rate_limit_max: u32) -> (AppState, Router) {
    let config = test_config(rate_limit_max);

    let storage = storage::connect(&config).await.unwrap();
    let rp_origin = Url::parse(&config.rp_origin).unwrap();
    let webauthn = WebauthnBuilder::new(&config.rp_id, &rp_origin)
        .unwrap()
        .rp_name(&config.rp_name)
        .build()
        .unwrap();

    let state = AppState {
        storage,
        webauthn: Arc::new(webauthn),
        sessions: Arc::new(SessionIssuer::new(&config.session_secret)),
        limiter: RateLimiter::new(),
        config: Arc::new(config),
    };

    let router = create_router(state.clone());
    (state, router)
}

/// The `challenge_session=<id>` pair from a Begin response.
pub fn challenge_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("challenge_session="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .expect("begin response sets a challenge_session cookie")
}

/// Just the session id from a `challenge_session=<id>` pair.
pub fn cookie_value(pair: &str) -> &str {
    pair.split_once('=').map(|(_, v)| v).unwrap_or_default()
}
