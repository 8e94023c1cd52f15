// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend Circle: profiles and friend requests
//!
//! This crate provides the backend API for a small social network: users
//! register a profile under their Firebase identity, then find, request,
//! accept and list friends. Profiles are stored in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, FriendService, ProfileService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub profile_service: ProfileService,
    pub friend_service: FriendService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}

impl AppState {
    /// Wire the services around one store and one token verifier.
    pub fn new(config: Config, db: FirestoreDb, token_verifier: Arc<FirebaseTokenVerifier>) -> Self {
        Self {
            profile_service: ProfileService::new(db.clone()),
            friend_service: FriendService::new(db.clone()),
            config,
            db,
            token_verifier,
        }
    }
}
