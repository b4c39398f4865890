// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fbla_attendance::error::AppError;
use fbla_attendance::services::DecodeError;

async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_not_a_member_is_forbidden_with_message() {
    let (status, body) = error_body(AppError::NotAMember).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("ask an officer for help"));
}

#[tokio::test]
async fn test_decode_errors_map_to_unprocessable() {
    let (status, body) = error_body(DecodeError::Unrecognized.into()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "code_not_recognized");

    let (status, body) = error_body(DecodeError::Malformed.into()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "malformed_code");
}

#[tokio::test]
async fn test_verification_unavailable_hides_cause() {
    let (status, body) =
        error_body(AppError::VerificationUnavailable("deadline exceeded".to_string())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "verification_unavailable");
    assert!(!body["details"].as_str().unwrap().contains("deadline"));
}

#[tokio::test]
async fn test_write_failed_is_bad_gateway() {
    let (status, body) = error_body(AppError::WriteFailed("unavailable".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "write_failed");
}

#[tokio::test]
async fn test_internal_errors_have_no_details() {
    let (status, body) = error_body(AppError::Database("boom".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());

    let (status, body) = error_body(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_auth_errors_are_unauthorized() {
    let (status, body) = error_body(AppError::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = error_body(AppError::InvalidToken).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}
