// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile service: register, read, edit and list user profiles.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{FriendRequest, User};
use crate::time_utils::now_rfc3339;

/// Fields required to register a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: String,
    pub email: String,
    pub username: String,
}

/// Partial profile edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// A profile with its relations loaded.
#[derive(Debug, Clone)]
pub struct ProfileDetails {
    pub user: User,
    pub friends: Vec<User>,
    /// Each received request paired with its sender
    pub friend_requests: Vec<(FriendRequest, User)>,
}

#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
}

impl ProfileService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Load the caller's profile or fail with not-found.
    pub async fn require_user(&self, uid: &str) -> Result<User> {
        self.db
            .get_user(uid)
            .await?
            .ok_or_else(AppError::user_not_found)
    }

    /// Register a profile for a newly authenticated identity.
    pub async fn create_profile(&self, uid: &str, profile: NewProfile) -> Result<User> {
        if self.db.get_user(uid).await?.is_some() {
            return Err(AppError::BadRequest(
                "User profile already exists".to_string(),
            ));
        }
        if self.db.find_user_by_email(&profile.email).await?.is_some() {
            return Err(AppError::BadRequest("Email is already in use".to_string()));
        }
        if self
            .db
            .find_user_by_username(&profile.username)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Username is already taken".to_string()));
        }

        let user = User::new(
            uid,
            profile.name,
            profile.email,
            profile.username,
            &now_rfc3339(),
        );
        self.db.create_user(&user).await?;

        tracing::info!(uid, username = %user.username, "Profile created");
        Ok(user)
    }

    /// Get the caller's profile with friends and request senders expanded.
    pub async fn get_profile(&self, uid: &str) -> Result<ProfileDetails> {
        let user = self.require_user(uid).await?;
        self.expand(user).await
    }

    /// Apply the provided fields to the caller's profile.
    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<ProfileDetails> {
        let mut user = self.require_user(uid).await?;

        if apply_update(&mut user, update) {
            user.updated_at = now_rfc3339();
            self.db.upsert_user(&user).await?;
            tracing::info!(uid, "Profile updated");
        }

        self.expand(user).await
    }

    /// Every user except the caller.
    pub async fn list_other_users(&self, uid: &str) -> Result<Vec<User>> {
        let caller = self.require_user(uid).await?;

        let users = self.db.list_users().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.firebase_uid != caller.firebase_uid)
            .collect())
    }

    async fn expand(&self, user: User) -> Result<ProfileDetails> {
        let friends = self.db.get_users_by_ids(&user.friends).await?;

        let sender_ids: Vec<String> = user
            .friend_requests
            .iter()
            .map(|r| r.from.clone())
            .collect();
        let senders = self.db.get_users_by_ids(&sender_ids).await?;

        let friend_requests = user
            .friend_requests
            .iter()
            .filter_map(|request| {
                let sender = senders.iter().find(|s| s.firebase_uid == request.from);
                if sender.is_none() {
                    tracing::warn!(
                        uid = %user.firebase_uid,
                        sender = %request.from,
                        "Dropping friend request from missing user"
                    );
                }
                sender.map(|sender| (request.clone(), sender.clone()))
            })
            .collect();

        Ok(ProfileDetails {
            user,
            friends,
            friend_requests,
        })
    }
}

/// Returns true if anything changed. A blank name is ignored; a blank bio clears it.
fn apply_update(user: &mut User, update: ProfileUpdate) -> bool {
    let mut changed = false;

    if let Some(name) = update.name.map(|n| n.trim().to_string()) {
        if !name.is_empty() && name != user.name {
            user.name = name;
            changed = true;
        }
    }

    if let Some(bio) = update.bio {
        let bio = Some(bio.trim().to_string()).filter(|b| !b.is_empty());
        if bio != user.bio {
            user.bio = bio;
            changed = true;
        }
    }

    changed
}
