// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::{ScanGate, VerificationOutcome, VerificationState};
use crate::routes::auth::{clear_session_cookie, cookies_secure};
use crate::services::attendance::{DecodedEvent, RecordResult, ScanFlow};
use crate::services::VerificationResult;
use crate::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require a session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/verify", post(verify))
        .route("/api/scan", post(scan))
}

// ─── Session ─────────────────────────────────────────────────

/// Current session as shown on the home screen.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub uid: String,
    pub display_email: String,
    pub verified: bool,
    pub last_outcome: Option<VerificationOutcome>,
}

impl SessionResponse {
    pub fn new(uid: &str, state: &VerificationState) -> Self {
        Self {
            uid: uid.to_string(),
            display_email: state.display_email.clone(),
            verified: state.verified,
            last_outcome: state.last_outcome,
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Json<SessionResponse>> {
    let entry = state
        .sessions
        .get(&auth.session_id)
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse::new(&auth.user.uid, &entry.state)))
}

// ─── Verification ────────────────────────────────────────────

/// Re-run the membership check for the signed-in identity.
///
/// A negative result is reported, not acted on; the scan gate decides what
/// happens to an unverified session.
async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Json<SessionResponse>> {
    let result = state.verifier.verify(auth.user.email_or_empty()).await;

    let updated = state
        .sessions
        .apply(&auth.session_id, &result)
        .ok_or(AppError::Unauthorized)?;

    if let VerificationResult::QueryFailed(msg) = result {
        return Err(AppError::VerificationUnavailable(msg));
    }

    Ok(Json(SessionResponse::new(&auth.user.uid, &updated)))
}

// ─── Scanning ────────────────────────────────────────────────

/// Decoded QR payload from the device.
#[derive(Deserialize, Validate)]
pub struct ScanRequest {
    /// First payload found in the captured image; absent if none was readable.
    #[validate(length(max = 1024))]
    pub payload: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanResponse {
    pub title: String,
    pub summary: String,
    pub event: DecodedEvent,
}

/// Record attendance for a scanned event code.
///
/// Gated on the session's last known verification state. A session known
/// not to belong to a member is signed out as part of the denial.
async fn scan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    jar: CookieJar,
    Json(request): Json<ScanRequest>,
) -> Response {
    let Some(entry) = state.sessions.get(&auth.session_id) else {
        return AppError::Unauthorized.into_response();
    };

    match entry.state.gate() {
        ScanGate::Open => {}
        ScanGate::Denied { sign_out: true } => {
            state.sessions.close(&auth.session_id);
            tracing::warn!(
                uid = %auth.user.uid,
                "Unverified account tried to scan; signed out"
            );
            let secure = cookies_secure(&state.config.frontend_url);
            return (clear_session_cookie(jar, secure), AppError::NotAMember).into_response();
        }
        ScanGate::Denied { sign_out: false } => {
            return AppError::VerificationUnavailable(
                "last membership check did not complete".to_string(),
            )
            .into_response();
        }
    }

    match record_scan(&state, &auth, request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn record_scan(
    state: &AppState,
    auth: &AuthSession,
    request: ScanRequest,
) -> Result<ScanResponse> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut flow = ScanFlow::default();
    flow.capture(request.payload)?;
    let event = flow.decode()??;

    tracing::debug!(
        uid = %auth.user.uid,
        event_name = %event.event_name,
        "Attendance code decoded"
    );

    match flow
        .record(state.store.as_ref(), auth.user.email_or_empty())
        .await?
    {
        RecordResult::Recorded => Ok(ScanResponse {
            title: "Points Inputted!".to_string(),
            summary: event.summary(),
            event,
        }),
        RecordResult::NoIdentity => Err(AppError::NoIdentity),
        RecordResult::WriteFailed(msg) => Err(AppError::WriteFailed(msg)),
    }
}
