// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FBLA Attendance API Server
//!
//! Verifies chapter membership for Google-signed-in users and records
//! event attendance from scanned QR codes.

use fbla_attendance::{
    config::Config,
    db::{ClubStore, FirestoreDb},
    services::GoogleIdentityVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting FBLA Attendance API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;
    let store: Arc<dyn ClubStore> = Arc::new(db);

    let identity = Arc::new(GoogleIdentityVerifier::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, identity));

    // Build router
    let app = fbla_attendance::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fbla_attendance=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
