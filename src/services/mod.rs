// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod friends;
pub mod profile;

pub use firebase_auth::{FirebaseTokenVerifier, TokenError, VerifiedIdentity};
pub use friends::FriendService;
pub use profile::{NewProfile, ProfileDetails, ProfileService, ProfileUpdate};
