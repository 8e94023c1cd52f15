// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: register, read and edit the caller's profile, list users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::FriendRequestStatus;
use crate::routes::UserSummary;
use crate::services::{NewProfile, ProfileDetails, ProfileUpdate};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users/profile",
            get(get_profile).post(create_profile).put(update_profile),
        )
        .route("/api/users/list", get(list_users))
}

/// Registration body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub username: String,
}

impl CreateProfileRequest {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

/// A received friend request with the sender expanded.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FriendRequestView {
    /// Same as the sender id; requests are addressed by sender
    #[serde(rename = "_id")]
    pub id: String,
    pub from: UserSummary,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub status: FriendRequestStatus,
}

/// The caller's own profile with relations expanded.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub firebase_uid: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub friends: Vec<UserSummary>,
    pub friend_requests: Vec<FriendRequestView>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProfileDetails> for ProfileResponse {
    fn from(details: ProfileDetails) -> Self {
        let user = details.user;
        Self {
            id: user.firebase_uid.clone(),
            firebase_uid: user.firebase_uid,
            name: user.name,
            email: user.email,
            username: user.username,
            bio: user.bio,
            friends: details.friends.into_iter().map(UserSummary::from).collect(),
            friend_requests: details
                .friend_requests
                .into_iter()
                .map(|(request, sender)| FriendRequestView {
                    id: request.from,
                    from: sender.into(),
                    status: request.status,
                })
                .collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Register the caller's profile.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProfileResponse>)> {
    let Json(body) = payload?;
    let body = body.trimmed();
    body.validate()?;

    let created = state
        .profile_service
        .create_profile(
            &user.uid,
            NewProfile {
                name: body.name,
                email: body.email,
                username: body.username,
            },
        )
        .await?;

    let details = ProfileDetails {
        user: created,
        friends: Vec::new(),
        friend_requests: Vec::new(),
    };
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// Get the caller's profile.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let details = state.profile_service.get_profile(&user.uid).await?;
    Ok(Json(details.into()))
}

/// Update name and/or bio.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>> {
    let Json(body) = payload?;
    body.validate()?;

    let details = state
        .profile_service
        .update_profile(
            &user.uid,
            ProfileUpdate {
                name: body.name,
                bio: body.bio,
            },
        )
        .await?;
    Ok(Json(details.into()))
}

/// All users other than the caller.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = state.profile_service.list_other_users(&user.uid).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}
