// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relationship service.
//!
//! Friend requests are stored on the recipient's document and addressed by
//! sender id. Accepting a request updates both users in one transaction.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{FriendRequestAction, User};
use crate::time_utils::now_rfc3339;
use rand::seq::SliceRandom;
use rand::Rng;

/// Number of users returned by `suggestions`.
pub const SUGGESTION_COUNT: usize = 5;

#[derive(Clone)]
pub struct FriendService {
    db: FirestoreDb,
}

impl FriendService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    async fn require_user(&self, uid: &str) -> Result<User> {
        self.db
            .get_user(uid)
            .await?
            .ok_or_else(AppError::user_not_found)
    }

    /// A random sample of users who are neither the caller nor already friends.
    pub async fn suggestions(&self, uid: &str) -> Result<Vec<User>> {
        let caller = self.require_user(uid).await?;
        let candidates = self.db.list_users().await?;

        let picked = sample_suggestions(
            &caller,
            candidates,
            SUGGESTION_COUNT,
            &mut rand::thread_rng(),
        );
        tracing::debug!(uid, count = picked.len(), "Friend suggestions");
        Ok(picked)
    }

    /// Record a pending request from the caller on `target_id`.
    pub async fn send_request(&self, uid: &str, target_id: &str) -> Result<()> {
        let caller = self.require_user(uid).await?;
        let mut target = self.require_user(target_id).await?;

        let now = now_rfc3339();
        target
            .receive_request(&caller.firebase_uid, &now)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        target.updated_at = now;

        self.db.upsert_user(&target).await?;

        tracing::info!(from = uid, to = target_id, "Friend request sent");
        Ok(())
    }

    /// Accept or reject the request the caller received from `sender_id`.
    pub async fn respond(
        &self,
        uid: &str,
        sender_id: &str,
        action: FriendRequestAction,
    ) -> Result<()> {
        let mut caller = self.require_user(uid).await?;

        if caller.resolve_request(sender_id, action).is_none() {
            return Err(AppError::NotFound("Friend request not found".to_string()));
        }

        let now = now_rfc3339();
        caller.updated_at = now.clone();

        match action {
            FriendRequestAction::Reject => {
                self.db.upsert_user(&caller).await?;
            }
            FriendRequestAction::Accept => match self.db.get_user(sender_id).await? {
                Some(mut sender) => {
                    sender.add_friend(&caller.firebase_uid);
                    sender.updated_at = now;
                    self.db.upsert_users_atomic(&[&caller, &sender]).await?;
                }
                None => {
                    tracing::warn!(
                        uid,
                        sender_id,
                        "Sender profile missing; accepting on recipient side only"
                    );
                    self.db.upsert_user(&caller).await?;
                }
            },
        }

        tracing::info!(
            uid,
            sender_id,
            action = action.past_tense(),
            "Friend request answered"
        );
        Ok(())
    }

    /// The caller's friends, in friendship order.
    pub async fn list_friends(&self, uid: &str) -> Result<Vec<User>> {
        let caller = self.require_user(uid).await?;
        self.db.get_users_by_ids(&caller.friends).await
    }
}

/// Pick up to `count` users uniformly at random, excluding `caller` and its friends.
pub fn sample_suggestions<R: Rng + ?Sized>(
    caller: &User,
    candidates: Vec<User>,
    count: usize,
    rng: &mut R,
) -> Vec<User> {
    let eligible: Vec<User> = candidates
        .into_iter()
        .filter(|u| u.firebase_uid != caller.firebase_uid && !caller.is_friend(&u.firebase_uid))
        .collect();

    eligible.choose_multiple(rng, count).cloned().collect()
}
