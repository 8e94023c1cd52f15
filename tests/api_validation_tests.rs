// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.
//!
//! Bodies are validated before the store is touched, so these run against
//! the offline database.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn status_for(method: &str, uri: &str, body: serde_json::Value) -> StatusCode {
    let (app, state) = common::create_test_app();
    let token = common::create_test_id_token(&state.config, "uid1");

    app.oneshot(common::json_request(method, uri, Some(&token), Some(body)))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_create_profile_missing_fields() {
    let status = status_for("POST", "/api/users/profile", json!({ "name": "Alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_profile_blank_name() {
    let status = status_for(
        "POST",
        "/api/users/profile",
        json!({ "name": "   ", "email": "alice@example.com", "username": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_profile_invalid_email() {
    let status = status_for(
        "POST",
        "/api/users/profile",
        json!({ "name": "Alice", "email": "not-an-email", "username": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_profile_bio_too_long() {
    let status = status_for(
        "PUT",
        "/api/users/profile",
        json!({ "bio": "a".repeat(501) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_friend_request_missing_user_id() {
    let status = status_for("POST", "/api/users/friend-request", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_respond_unknown_action() {
    let status = status_for(
        "PUT",
        "/api/users/friend-request",
        json!({ "requestId": "uid2", "action": "ignore" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_respond_missing_request_id() {
    let status = status_for(
        "PUT",
        "/api/users/friend-request",
        json!({ "action": "accept" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_id_token(&state.config, "uid1");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users/profile")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}
