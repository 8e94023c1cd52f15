// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage, including embedded friend requests.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
///
/// Stored at: `users/{firebase_uid}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Firebase Auth subject id (also used as document ID and public user id)
    pub firebase_uid: String,
    /// Display name
    pub name: String,
    /// Email address (unique across users)
    pub email: String,
    /// Username (unique across users)
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Friend user ids, in the order the friendships were made
    #[serde(default)]
    pub friends: Vec<String>,
    /// Requests received from other users
    #[serde(default)]
    pub friend_requests: Vec<FriendRequest>,
    /// When the profile was registered (RFC 3339)
    pub created_at: String,
    /// Last profile or relationship change (RFC 3339)
    pub updated_at: String,
}

/// A friend request embedded in the recipient's document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendRequest {
    /// Sender user id
    pub from: String,
    pub status: FriendRequestStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// How the recipient answers a friend request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

impl FriendRequestAction {
    /// Past tense used in acknowledgement messages.
    pub fn past_tense(self) -> &'static str {
        match self {
            FriendRequestAction::Accept => "accepted",
            FriendRequestAction::Reject => "rejected",
        }
    }
}

/// Why a friend request could not be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRequestError {
    #[error("Cannot send a friend request to yourself")]
    SelfRequest,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("Friend request already sent")]
    AlreadyPending,
}

impl User {
    /// Build a fresh profile with no relationships.
    pub fn new(
        firebase_uid: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        now: &str,
    ) -> Self {
        Self {
            firebase_uid: firebase_uid.into(),
            name: name.into(),
            email: email.into(),
            username: username.into(),
            bio: None,
            friends: Vec::new(),
            friend_requests: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn is_friend(&self, user_id: &str) -> bool {
        self.friends.iter().any(|id| id == user_id)
    }

    /// Add a friend unless already present or self. Returns true if added.
    pub fn add_friend(&mut self, user_id: &str) -> bool {
        if user_id == self.firebase_uid || self.is_friend(user_id) {
            return false;
        }
        self.friends.push(user_id.to_string());
        true
    }

    pub fn request_from(&self, sender_id: &str) -> Option<&FriendRequest> {
        self.friend_requests.iter().find(|r| r.from == sender_id)
    }

    fn request_from_mut(&mut self, sender_id: &str) -> Option<&mut FriendRequest> {
        self.friend_requests.iter_mut().find(|r| r.from == sender_id)
    }

    /// Record a pending request from `sender_id` on this (recipient) user.
    ///
    /// A resolved request from the same sender is re-opened rather than
    /// duplicated, so there is at most one record per sender.
    pub fn receive_request(&mut self, sender_id: &str, now: &str) -> Result<(), SendRequestError> {
        if sender_id == self.firebase_uid {
            return Err(SendRequestError::SelfRequest);
        }
        if self.is_friend(sender_id) {
            return Err(SendRequestError::AlreadyFriends);
        }

        match self.request_from_mut(sender_id) {
            Some(existing) if existing.status == FriendRequestStatus::Pending => {
                Err(SendRequestError::AlreadyPending)
            }
            Some(existing) => {
                existing.status = FriendRequestStatus::Pending;
                existing.created_at = Some(now.to_string());
                Ok(())
            }
            None => {
                self.friend_requests.push(FriendRequest {
                    from: sender_id.to_string(),
                    status: FriendRequestStatus::Pending,
                    created_at: Some(now.to_string()),
                });
                Ok(())
            }
        }
    }

    /// Apply `action` to the request from `sender_id`.
    ///
    /// Returns `None` if there is no request from that sender. Resolved
    /// requests are not guarded against being answered again.
    pub fn resolve_request(
        &mut self,
        sender_id: &str,
        action: FriendRequestAction,
    ) -> Option<FriendRequestStatus> {
        let request = self.request_from_mut(sender_id)?;
        request.status = match action {
            FriendRequestAction::Accept => FriendRequestStatus::Accepted,
            FriendRequestAction::Reject => FriendRequestStatus::Rejected,
        };
        let status = request.status;

        if status == FriendRequestStatus::Accepted {
            self.add_friend(sender_id);
        }
        Some(status)
    }

    #[cfg(test)]
    fn pending_requests(&self) -> impl Iterator<Item = &FriendRequest> {
        self.friend_requests
            .iter()
            .filter(|r| r.status == FriendRequestStatus::Pending)
    }
}
