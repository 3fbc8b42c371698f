//! Router assembly

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, thoughts};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Cookie-correlated ceremonies only make sense same-origin; restrict CORS
    // to the configured origin outside of debug builds.
    let cors = if cfg!(debug_assertions) {
        CorsLayer::permissive()
    } else {
        match state.config.rp_origin.parse() {
            Ok(origin) => CorsLayer::new()
                .allow_origin([origin])
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
            Err(_) => CorsLayer::new(),
        }
    };

    Router::new()
        .route("/health", get(health::health_check))
        // Registration ceremony
        .route("/api/auth/register-options", post(auth::register_options))
        .route("/api/auth/register-verify", post(auth::register_verify))
        // Authentication ceremony
        .route("/api/auth/login-options", post(auth::login_options))
        .route("/api/auth/login-verify", post(auth::login_verify))
        // Thought feed
        .route(
            "/api/thoughts",
            get(thoughts::list_thoughts).post(thoughts::create_thought),
        )
        .route("/api/thoughts/{id}", put(thoughts::update_thought))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
