// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in and sign-out routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, decode_session_jwt, SESSION_COOKIE};
use crate::routes::api::SessionResponse;
use crate::services::IdentityError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", post(sign_in))
        .route("/auth/logout", post(logout))
}

/// Sign-in request from the mobile client.
#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    /// Google ID token from the Sign-In SDK
    #[validate(length(min = 1, max = 4096))]
    pub id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    /// Session token for `Authorization: Bearer` use
    pub token: String,
    pub session: SessionResponse,
}

/// Whether cookies must be marked `Secure` (anything not served over plain http).
pub(crate) fn cookies_secure(frontend_url: &str) -> bool {
    !frontend_url.starts_with("http://")
}

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Remove the session cookie with the same attributes it was created with.
pub(crate) fn clear_session_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.remove(
        Cookie::build(SESSION_COOKIE)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure),
    )
}

/// Exchange a Google ID token for a session, then run the membership check once.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .identity
        .verify_id_token(&request.id_token)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(reason) => {
                tracing::warn!(reason = %reason, "Sign-in rejected");
                AppError::InvalidToken
            }
            IdentityError::Transient(msg) => AppError::IdentityProvider(msg),
        })?;

    let session_id = state.sessions.open(&user)?;

    let result = state.verifier.verify(user.email_or_empty()).await;
    let verification = state
        .sessions
        .apply(&session_id, &result)
        .ok_or(AppError::Unauthorized)?;

    tracing::info!(
        uid = %user.uid,
        verified = verification.verified,
        "User signed in"
    );

    let token = create_session_jwt(&user, &session_id, &state.config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let secure = cookies_secure(&state.config.frontend_url);
    let jar = jar.add(session_cookie(token.clone(), secure));

    Ok((
        jar,
        Json(SignInResponse {
            token,
            session: SessionResponse::new(&user.uid, &verification),
        }),
    ))
}

/// Sign out: close the session (if any) and clear the cookie.
///
/// Always succeeds; an unknown or expired token simply has nothing to close.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(String::from)
        });

    if let Some(claims) =
        token.and_then(|t| decode_session_jwt(&t, &state.config.session_signing_key).ok())
    {
        if state.sessions.close(&claims.sid) {
            tracing::info!(uid = %claims.sub, "User signed out");
        }
    }

    let secure = cookies_secure(&state.config.frontend_url);
    (StatusCode::NO_CONTENT, clear_session_cookie(jar, secure))
}
