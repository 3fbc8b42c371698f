//! Thought feed API tests

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::test_app;

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_thought(cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/thoughts")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn posting_requires_a_session() {
    let (_state, app) = test_app(100).await;

    let response = app
        .oneshot(post_thought(None, &json!({ "content": "hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn posted_thought_appears_in_the_feed() {
    let (state, app) = test_app(100).await;

    let token = state.sessions.issue("user-1").unwrap();
    let cookie = format!("session={token}");

    let response = app
        .clone()
        .oneshot(post_thought(
            Some(&cookie),
            &json!({
                "content": "  first post  ",
                "font": "mono",
                "category": "diary"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["content"], "first post");
    assert_eq!(created["font"], "mono");
    assert_eq!(created["category"], "diary");
    assert_eq!(created["color"], "default");
    assert_eq!(created["user_id"], "user-1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/thoughts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let feed = body_json(response).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["content"], "first post");
}

#[tokio::test]
async fn unknown_style_values_fall_back_to_defaults() {
    let (state, app) = test_app(100).await;

    let token = state.sessions.issue("user-1").unwrap();
    let cookie = format!("session={token}");

    let response = app
        .oneshot(post_thought(
            Some(&cookie),
            &json!({
                "content": "styled",
                "font": "comic-sans",
                "category": "rant",
                "color": "ultraviolet"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["font"], "sans-serif");
    assert_eq!(created["category"], "thought");
    assert_eq!(created["color"], "default");
}

#[tokio::test]
async fn empty_and_oversized_content_are_rejected() {
    let (state, app) = test_app(100).await;

    let token = state.sessions.issue("user-1").unwrap();
    let cookie = format!("session={token}");

    let response = app
        .clone()
        .oneshot(post_thought(Some(&cookie), &json!({ "content": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let long = "x".repeat(2001);
    let response = app
        .oneshot(post_thought(Some(&cookie), &json!({ "content": long })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blacklisted_content_is_rejected() {
    let (state, app) = test_app(100).await;

    let token = state.sessions.issue("user-1").unwrap();
    let cookie = format!("session={token}");

    let response = app
        .oneshot(post_thought(
            Some(&cookie),
            &json!({ "content": "kill all of them" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Content not allowed");
}

#[tokio::test]
async fn feed_paginates_with_the_before_cursor() {
    let (state, app) = test_app(100).await;

    let token = state.sessions.issue("user-1").unwrap();
    let cookie = format!("session={token}");

    for i in 1..=4 {
        let response = app
            .clone()
            .oneshot(post_thought(
                Some(&cookie),
                &json!({ "content": format!("post {i}") }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/thoughts?limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page.as_array().unwrap().len(), 2);
    assert_eq!(page[0]["content"], "post 4");

    let cursor = page[1]["id"].as_i64().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/thoughts?before={cursor}&limit=2"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page[0]["content"], "post 2");
}

#[tokio::test]
async fn edits_are_owner_scoped() {
    let (state, app) = test_app(100).await;

    let owner = format!("session={}", state.sessions.issue("user-1").unwrap());
    let stranger = format!("session={}", state.sessions.issue("user-2").unwrap());

    let response = app
        .clone()
        .oneshot(post_thought(Some(&owner), &json!({ "content": "mine" })))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();

    let edit = |cookie: &str, content: &str| {
        Request::builder()
            .method("PUT")
            .uri(format!("/api/thoughts/{id}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie)
            .body(Body::from(json!({ "content": content }).to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(edit(&stranger, "hijacked"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(edit(&owner, "edited")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["content"], "edited");
}
