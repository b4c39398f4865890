// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FBLA Attendance: membership verification and event check-in
//!
//! This crate provides the backend API for the chapter's mobile app.
//! Members sign in with Google, are verified against the chapter's
//! membership list in Firestore, and scan event QR codes to record
//! attendance points.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::ClubStore;
use services::{GoogleIdentityVerifier, MembershipVerifier, SessionRegistry};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ClubStore>,
    pub verifier: MembershipVerifier,
    pub identity: Arc<GoogleIdentityVerifier>,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Wire the services around one store handle.
    pub fn new(
        config: Config,
        store: Arc<dyn ClubStore>,
        identity: Arc<GoogleIdentityVerifier>,
    ) -> Self {
        Self {
            config,
            verifier: MembershipVerifier::new(store.clone()),
            store,
            identity,
            sessions: SessionRegistry::new(),
        }
    }
}
