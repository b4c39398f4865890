// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-process store).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::MembershipRecord;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Registered members, looked up by `email`
    pub const USERS: &str = "users";
    /// Event documents keyed by attendance code
    pub const ACTIVITY_POINTS: &str = "activity points";
}

/// The two document operations the club backend performs.
#[async_trait]
pub trait ClubStore: Send + Sync {
    /// Equality query on `users.email`.
    async fn find_members_by_email(&self, email: &str) -> Result<Vec<MembershipRecord>, AppError>;

    /// Set-union `email` into the `Attendees` list of `activity points/{event_code}`.
    async fn add_attendee(&self, event_code: &str, email: &str) -> Result<(), AppError>;
}
