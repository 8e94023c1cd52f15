// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use friend_circle::config::Config;
use friend_circle::db::FirestoreDb;
use friend_circle::routes::create_router;
use friend_circle::services::FirebaseTokenVerifier;
use friend_circle::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEST_KID: &str = "test-kid";
const SIGNING_KEY: &str = include_str!("../fixtures/test_signing_key.pem");
const VERIFYING_KEY: &str = include_str!("../fixtures/test_signing_key.pub.pem");
#[allow(dead_code)]
pub const UNTRUSTED_SIGNING_KEY: &str = include_str!("../fixtures/untrusted_signing_key.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique id so tests sharing an emulator never collide.
#[allow(dead_code)]
pub fn unique_uid(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

fn verifier(config: &Config) -> Arc<FirebaseTokenVerifier> {
    Arc::new(
        FirebaseTokenVerifier::new_with_static_key(
            config,
            TEST_KID,
            DecodingKey::from_rsa_pem(VERIFYING_KEY.as_bytes()).unwrap(),
        )
        .unwrap(),
    )
}

/// Create a test app with an offline database.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let token_verifier = verifier(&config);
    let state = Arc::new(AppState::new(config, FirestoreDb::new_mock(), token_verifier));
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let token_verifier = verifier(&config);
    let state = Arc::new(AppState::new(config, test_db().await, token_verifier));
    (create_router(state.clone()), state)
}

#[derive(Serialize)]
struct IdTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    exp: u64,
    iat: u64,
    auth_time: u64,
    email: String,
}

/// Sign a Firebase-style ID token with the given PEM key.
#[allow(dead_code)]
pub fn sign_id_token(config: &Config, uid: &str, pem: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = IdTokenClaims {
        iss: config.token_issuer(),
        aud: config.firebase_project_id.clone(),
        sub: uid.to_string(),
        exp: now + 3600,
        iat: now,
        auth_time: now,
        email: format!("{uid}@example.com"),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
    )
    .unwrap()
}

/// ID token for `uid` that the test app accepts.
#[allow(dead_code)]
pub fn create_test_id_token(config: &Config, uid: &str) -> String {
    sign_id_token(config, uid, SIGNING_KEY)
}

/// Build a JSON request, authenticated when `token` is given.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
