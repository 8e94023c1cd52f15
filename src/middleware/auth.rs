// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer ID token authentication middleware.

use crate::error::AppError;
use crate::services::TokenError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Firebase uid
    pub uid: String,
    pub email: String,
}

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request.headers().get(header::AUTHORIZATION);
    if auth_header.is_none() {
        return Err(AppError::Unauthorized);
    }

    let identity = state
        .token_verifier
        .verify_bearer(auth_header)
        .await
        .map_err(|err| match err {
            TokenError::Invalid(reason) => {
                tracing::warn!(reason = %reason, "Rejected request with invalid ID token");
                AppError::InvalidToken
            }
            TokenError::Transient(reason) => AppError::AuthUnavailable(reason),
        })?;

    request.extensions_mut().insert(AuthUser {
        uid: identity.uid,
        email: identity.email,
    });

    Ok(next.run(request).await)
}
