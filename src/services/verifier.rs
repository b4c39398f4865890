// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Membership verification.
//!
//! A signed-in identity is a member when its email matches at least one
//! document in the `users` collection.

use crate::db::ClubStore;
use std::sync::Arc;

/// Result of a single membership lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Carries the display name (the verified email).
    Verified(String),
    Unverified,
    /// The lookup itself failed; neither verified nor unverified.
    QueryFailed(String),
}

/// Checks signed-in identities against the membership collection.
#[derive(Clone)]
pub struct MembershipVerifier {
    store: Arc<dyn ClubStore>,
}

impl MembershipVerifier {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    /// Look up `email` in the membership collection.
    ///
    /// An empty email is unverified without touching the store.
    pub async fn verify(&self, email: &str) -> VerificationResult {
        if email.is_empty() {
            tracing::debug!("No email on identity, skipping membership query");
            return VerificationResult::Unverified;
        }

        match self.store.find_members_by_email(email).await {
            Ok(members) if !members.is_empty() => {
                for member in &members {
                    tracing::debug!(doc_id = ?member.doc_id, "Matched membership record");
                }
                tracing::info!(email, matches = members.len(), "Membership verified");
                VerificationResult::Verified(email.to_string())
            }
            Ok(_) => {
                tracing::info!(email, "No membership record for email");
                VerificationResult::Unverified
            }
            Err(e) => {
                tracing::warn!(email, error = %e, "Membership query failed");
                VerificationResult::QueryFailed(e.to_string())
            }
        }
    }
}
