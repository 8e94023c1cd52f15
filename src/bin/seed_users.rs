// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Load a handful of demo profiles for local development.
//!
//! Run against the emulator with `FIRESTORE_EMULATOR_HOST` set. Existing
//! profiles are left untouched, so the tool can be run repeatedly.

use friend_circle::{config::Config, db::FirestoreDb, models::User, time_utils::now_rfc3339};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// (uid, username, name, bio)
const DEMO_USERS: &[(&str, &str, &str, &str)] = &[
    ("uid1", "alice", "Alice", "Loves hiking"),
    ("uid2", "bob", "Bob", "Coffee enthusiast"),
    ("uid3", "charlie", "Charlie", "Gamer"),
    ("uid4", "diana", "Diana", "Bookworm"),
    ("uid5", "eve", "Eve", "Music lover"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = FirestoreDb::new(&config.gcp_project_id).await?;
    let now = now_rfc3339();

    let mut created = 0;
    for (uid, username, name, bio) in DEMO_USERS {
        if db.get_user(uid).await?.is_some() {
            tracing::info!(uid, "Already seeded, skipping");
            continue;
        }

        let mut user = User::new(*uid, *name, format!("{username}@example.com"), *username, &now);
        user.bio = Some(bio.to_string());
        db.create_user(&user).await?;
        created += 1;
    }

    tracing::info!(created, total = DEMO_USERS.len(), "Seeded users");
    Ok(())
}
