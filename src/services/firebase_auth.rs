// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by the `securetoken` service account.
//! Public keys are fetched from Google and cached for the `max-age`
//! advertised by the key endpoint.

use crate::config::Config;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Unknown kids are attacker-controlled; never refetch keys more often than this.
const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Caller identity extracted from a valid ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    /// Empty if the account has no email
    pub email: String,
}

/// Token verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The token is missing/invalid or claims do not match expectations.
    #[error("invalid ID token: {0}")]
    Invalid(String),
    /// Signing keys could not be fetched.
    #[error("token verification unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Verifier for Firebase-issued ID tokens.
///
/// One instance is built at startup and shared through `AppState`.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    jwks_url: String,
    project_id: String,
    expected_issuer: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Create a production verifier that fetches and caches Google's keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::build(config, VerifierMode::Google)?;

        tracing::info!(
            project = %verifier.project_id,
            issuer = %verifier.expected_issuer,
            "Initialized Firebase ID token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Self::build(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn build(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            jwks_url: SECURETOKEN_JWKS_URL.to_string(),
            project_id: config.firebase_project_id.clone(),
            expected_issuer: config.token_issuer(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify the bearer token carried in an Authorization header.
    pub async fn verify_bearer(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<VerifiedIdentity, TokenError> {
        let token = extract_bearer_token(auth_header)?;
        self.verify_id_token(token).await
    }

    /// Verify a raw Firebase ID token.
    pub async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let header = decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| TokenError::Invalid(format!("JWT validation failed: {e}")))?
            .claims;

        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(TokenError::Invalid("sub claim has invalid length".to_string()));
        }

        validate_not_in_future("iat", claims.iat)?;
        validate_not_in_future("auth_time", claims.auth_time)?;

        tracing::debug!(uid = %claims.sub, "ID token verified");

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email.unwrap_or_default(),
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(TokenError::Invalid(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; an unknown kid forces a refetch unless one just happened.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(TokenError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), TokenError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(entry) = self.jwks_cache.read().await.as_ref() {
            let now = Instant::now();
            if !force_refresh && entry.expires_at > now {
                return Ok(());
            }
            if force_refresh
                && now.duration_since(entry.fetched_at) < MIN_FORCED_REFRESH_INTERVAL
            {
                tracing::debug!("Skipping forced JWKS refresh, keys were fetched recently");
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = %self.jwks_url, "Refreshing securetoken JWKS cache");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| TokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| TokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);

        if keys_by_kid.is_empty() {
            return Err(TokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        let fetched_at = Instant::now();
        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            fetched_at,
            expires_at: fetched_at + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Securetoken JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    sub: String,
    iat: Option<u64>,
    auth_time: Option<u64>,
    email: Option<String>,
}

/// Keep RS256 signing keys with a kid, skipping anything malformed.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, TokenError> {
    let value = auth_header
        .ok_or_else(|| TokenError::Invalid("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| TokenError::Invalid("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        TokenError::Invalid("Authorization header must be Bearer token".to_string())
    })?;

    if token.trim().is_empty() {
        return Err(TokenError::Invalid("Bearer token is empty".to_string()));
    }

    Ok(token.trim())
}

fn validate_not_in_future(claim: &str, value: Option<u64>) -> Result<(), TokenError> {
    let Some(value) = value else {
        return Err(TokenError::Invalid(format!("missing {claim} claim")));
    };

    if value > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(TokenError::Invalid(format!("{claim} claim is in the future")));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .map(str::trim)
        .filter_map(|directive| directive.strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_KID: &str = "test-kid";
    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/test_signing_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/test_signing_key.pub.pem");

    #[derive(Serialize)]
    struct TestClaims {
        iss: String,
        aud: String,
        sub: String,
        exp: u64,
        iat: u64,
        auth_time: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    }

    fn claims(config: &Config, sub: &str) -> TestClaims {
        let now = now_unix_secs();
        TestClaims {
            iss: config.token_issuer(),
            aud: config.firebase_project_id.clone(),
            sub: sub.to_string(),
            exp: now + 3600,
            iat: now,
            auth_time: now,
            email: Some(format!("{sub}@example.com")),
        }
    }

    fn sign(claims: &TestClaims, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    fn verifier(config: &Config) -> FirebaseTokenVerifier {
        FirebaseTokenVerifier::new_with_static_key(
            config,
            TEST_KID,
            DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn verifies_valid_token() {
        let config = Config::test_default();
        let token = sign(&claims(&config, "uid1"), TEST_KID);

        let identity = verifier(&config).verify_id_token(&token).await.unwrap();
        assert_eq!(identity.uid, "uid1");
        assert_eq!(identity.email, "uid1@example.com");
    }

    #[tokio::test]
    async fn missing_email_defaults_to_empty() {
        let config = Config::test_default();
        let mut c = claims(&config, "uid2");
        c.email = None;

        let identity = verifier(&config)
            .verify_id_token(&sign(&c, TEST_KID))
            .await
            .unwrap();
        assert_eq!(identity.email, "");
    }

    #[tokio::test]
    async fn rejects_wrong_audience_and_issuer() {
        let config = Config::test_default();
        let verifier = verifier(&config);

        let mut wrong_aud = claims(&config, "uid1");
        wrong_aud.aud = "other-project".to_string();
        assert!(matches!(
            verifier.verify_id_token(&sign(&wrong_aud, TEST_KID)).await,
            Err(TokenError::Invalid(_))
        ));

        let mut wrong_iss = claims(&config, "uid1");
        wrong_iss.iss = "https://accounts.google.com".to_string();
        assert!(matches!(
            verifier.verify_id_token(&sign(&wrong_iss, TEST_KID)).await,
            Err(TokenError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn rejects_expired_and_future_tokens() {
        let config = Config::test_default();
        let verifier = verifier(&config);

        let mut expired = claims(&config, "uid1");
        expired.exp = now_unix_secs() - 3600;
        assert!(verifier
            .verify_id_token(&sign(&expired, TEST_KID))
            .await
            .is_err());

        let mut future = claims(&config, "uid1");
        future.auth_time = now_unix_secs() + 3600;
        assert!(verifier
            .verify_id_token(&sign(&future, TEST_KID))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_kid_and_empty_sub() {
        let config = Config::test_default();
        let verifier = verifier(&config);

        assert!(verifier
            .verify_id_token(&sign(&claims(&config, "uid1"), "rotated-kid"))
            .await
            .is_err());
        assert!(verifier
            .verify_id_token(&sign(&claims(&config, ""), TEST_KID))
            .await
            .is_err());
    }

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=19302, must-revalidate"),
            Some(19302)
        );
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn extract_bearer_token_errors() {
        assert!(matches!(
            extract_bearer_token(None),
            Err(TokenError::Invalid(_))
        ));

        let basic = HeaderValue::from_static("Basic abc");
        assert!(extract_bearer_token(Some(&basic)).is_err());

        let empty = HeaderValue::from_static("Bearer ");
        assert!(extract_bearer_token(Some(&empty)).is_err());

        let ok = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(Some(&ok)).unwrap(), "abc.def.ghi");
    }

    /// Serve a one-key JWKS on a local port, counting fetches.
    async fn spawn_jwks_server(hits: Arc<AtomicUsize>) -> String {
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/jwks",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (
                        [(CACHE_CONTROL, "public, max-age=3600")],
                        Json(serde_json::json!({
                            "keys": [{
                                "kid": "current",
                                "kty": "RSA",
                                "alg": "RS256",
                                "use": "sig",
                                "n": "AQAB",
                                "e": "AQAB"
                            }]
                        })),
                    )
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/jwks")
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_within_interval() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config = Config::test_default();
        let mut verifier = FirebaseTokenVerifier::build(&config, VerifierMode::Google).unwrap();
        verifier.jwks_url = spawn_jwks_server(hits.clone()).await;

        for kid in ["random-kid-1", "random-kid-2", "random-kid-3"] {
            assert!(matches!(
                verifier.decoding_key_for_kid(kid).await,
                Err(TokenError::Invalid(_))
            ));
        }
        assert!(verifier.decoding_key_for_kid("current").await.is_ok());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forced_refresh_allowed_after_interval() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config = Config::test_default();
        let mut verifier = FirebaseTokenVerifier::build(&config, VerifierMode::Google).unwrap();
        verifier.jwks_url = spawn_jwks_server(hits.clone()).await;

        assert!(verifier.decoding_key_for_kid("random-kid").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Pretend the last fetch is older than the refresh interval
        if let Some(entry) = verifier.jwks_cache.write().await.as_mut() {
            entry.fetched_at -= MIN_FORCED_REFRESH_INTERVAL;
        }

        assert!(verifier.decoding_key_for_kid("random-kid").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn usable_keys_skips_foreign_entries() {
        let jwks: Jwks = serde_json::from_value(serde_json::json!({
            "keys": [
                { "kid": "ec", "kty": "EC", "n": "", "e": "" },
                { "kid": "hs", "kty": "RSA", "alg": "HS256", "n": "AQAB", "e": "AQAB" },
                { "kid": "enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB" }
            ]
        }))
        .unwrap();

        assert!(usable_keys(jwks).is_empty());
    }
}
