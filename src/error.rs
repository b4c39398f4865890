// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::services::attendance::{DecodeError, ScanFlowError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message shown when a signed-in identity has no membership record.
pub const NOT_A_MEMBER_MESSAGE: &str = "This account is not linked with a valid Homestead FBLA account, either sign in with a different account or ask an officer for help.";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Negative verification result at the scan gate.
    #[error("{}", NOT_A_MEMBER_MESSAGE)]
    NotAMember,

    /// Membership could not be checked; the session is left intact.
    #[error("Membership verification unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("Code not recognized")]
    CodeNotRecognized,

    #[error("Malformed attendance code")]
    MalformedCode,

    #[error("No email is associated with this account")]
    NoIdentity,

    #[error("Failed to record attendance: {0}")]
    WriteFailed(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Unrecognized => AppError::CodeNotRecognized,
            DecodeError::Malformed => AppError::MalformedCode,
        }
    }
}

impl From<ScanFlowError> for AppError {
    fn from(err: ScanFlowError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotAMember => (
                StatusCode::FORBIDDEN,
                "not_a_member",
                Some(NOT_A_MEMBER_MESSAGE.to_string()),
            ),
            AppError::VerificationUnavailable(msg) => {
                tracing::warn!(error = %msg, "Verification unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "verification_unavailable",
                    Some("Could not confirm membership, please try again".to_string()),
                )
            }
            AppError::CodeNotRecognized => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "code_not_recognized",
                Some("Retake image or ask an officer for help".to_string()),
            ),
            AppError::MalformedCode => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_code",
                Some("Retake image or ask an officer for help".to_string()),
            ),
            AppError::NoIdentity => (StatusCode::BAD_REQUEST, "no_identity", None),
            AppError::WriteFailed(msg) => {
                tracing::error!(error = %msg, "Attendance write failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "write_failed",
                    Some("Points were not recorded, please try again".to_string()),
                )
            }
            AppError::IdentityProvider(msg) => {
                (StatusCode::BAD_GATEWAY, "identity_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
