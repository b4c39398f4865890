// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use fbla_attendance::config::Config;
use fbla_attendance::db::{FirestoreDb, MemoryStore};
use fbla_attendance::routes::create_router;
use fbla_attendance::services::GoogleIdentityVerifier;
use fbla_attendance::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Key ID and secret the test identity verifier accepts.
pub const TEST_KID: &str = "test-kid";
pub const TEST_ID_TOKEN_SECRET: &[u8] = b"test-google-id-token-secret";

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

/// Router, shared state and the in-memory store behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

#[allow(dead_code)]
impl TestApp {
    /// Send a request and return status, headers and JSON body (Null if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    /// Sign in through `/auth/google` and return the session token.
    pub async fn sign_in(&self, email: Option<&str>) -> String {
        let (status, _, body) = self
            .send(json_request(
                "POST",
                "/auth/google",
                None,
                json!({ "id_token": google_id_token("google-uid-1", email) }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }
}

/// Create a test app over an in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_frontend_url("http://localhost:5173")
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> TestApp {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();

    let identity = GoogleIdentityVerifier::new_with_static_key(
        &config,
        TEST_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(TEST_ID_TOKEN_SECRET),
    )
    .expect("Failed to build test identity verifier");

    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone(), Arc::new(identity)));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

/// Mint a Google-shaped ID token the test verifier accepts.
#[allow(dead_code)]
pub fn google_id_token(sub: &str, email: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let mut claims = json!({
        "iss": "https://accounts.google.com",
        "aud": Config::test_default().google_client_id,
        "sub": sub,
        "iat": now,
        "exp": now + 3600,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
        claims["email_verified"] = json!(true);
    }

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_ID_TOKEN_SECRET)).unwrap()
}

/// Build a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodiless request, optionally with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}
