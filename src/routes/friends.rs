// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relationship routes: suggestions, friend requests, friend list.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::FriendRequestAction;
use crate::routes::{MessageResponse, UserSummary};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/suggestions", get(get_suggestions))
        .route(
            "/api/users/friend-request",
            post(send_friend_request).put(respond_to_friend_request),
        )
        .route("/api/users/friends", get(list_friends))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondFriendRequest {
    /// Sender id of the request being answered
    #[serde(default)]
    pub request_id: String,
    pub action: FriendRequestAction,
}

fn require_id(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("Missing required field: {field}")));
    }
    Ok(value.to_string())
}

/// Random users the caller is not yet friends with.
async fn get_suggestions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = state.friend_service.suggestions(&user.uid).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

async fn send_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<SendFriendRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(body) = payload?;
    let target_id = require_id(&body.user_id, "userId")?;

    state
        .friend_service
        .send_request(&user.uid, &target_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Friend request sent successfully".to_string(),
    }))
}

async fn respond_to_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<RespondFriendRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(body) = payload?;
    let sender_id = require_id(&body.request_id, "requestId")?;

    state
        .friend_service
        .respond(&user.uid, &sender_id, body.action)
        .await?;

    Ok(Json(MessageResponse {
        message: format!("Friend request {} successfully", body.action.past_tense()),
    }))
}

async fn list_friends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>> {
    let friends = state.friend_service.list_friends(&user.uid).await?;
    Ok(Json(friends.into_iter().map(UserSummary::from).collect()))
}
