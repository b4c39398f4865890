// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store with the same semantics as the Firestore collections.
//!
//! Used by tests and for running the API without a Firestore emulator.
//! Query and write failures can be injected to exercise error paths.

use crate::db::ClubStore;
use crate::error::AppError;
use crate::models::{AttendanceRecord, MembershipRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    members: DashMap<String, MembershipRecord>,
    events: DashMap<String, AttendanceRecord>,
    fail_queries: AtomicBool,
    fail_writes: AtomicBool,
    queries: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member under a generated document ID.
    pub fn insert_member(&self, email: &str) {
        let doc_id = format!("member-{}", self.members.len() + 1);
        self.members.insert(
            doc_id.clone(),
            MembershipRecord {
                doc_id: Some(doc_id),
                email: email.to_string(),
            },
        );
    }

    /// Snapshot of an event document, if one has been written.
    pub fn attendance(&self, event_code: &str) -> Option<AttendanceRecord> {
        self.events.get(event_code).map(|r| r.value().clone())
    }

    pub fn set_query_failure(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of membership queries issued (including failed ones).
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of attendee writes issued (including failed ones).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn find_members_by_email(&self, email: &str) -> Result<Vec<MembershipRecord>, AppError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated query failure".to_string()));
        }

        Ok(self
            .members
            .iter()
            .filter(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn add_attendee(&self, event_code: &str, email: &str) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".to_string()));
        }

        self.events
            .entry(event_code.to_string())
            .or_default()
            .union_attendee(email);
        Ok(())
    }
}
