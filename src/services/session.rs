// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in sessions and their verification state.
//!
//! A session lives from sign-in until sign-out, token expiry or process
//! restart. Nothing here is persisted.

use crate::error::AppError;
use crate::middleware::auth::SESSION_TTL_SECS;
use crate::models::{User, VerificationState};
use crate::services::verifier::VerificationResult;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const SESSION_ID_BYTES: usize = 32;

/// Live sessions one identity may hold; opening another evicts the oldest.
pub const MAX_SESSIONS_PER_USER: usize = 5;

/// Snapshot of one session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub user: User,
    pub state: VerificationState,
    pub expires_at: Instant,
    /// Open order within the registry.
    seq: u64,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Registry of active sessions keyed by session ID.
///
/// Entries expire with their session token. Expired entries read as absent
/// and are evicted whenever a session is opened.
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    rng: SystemRandom,
    ttl: Duration,
    next_seq: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(SESSION_TTL_SECS as u64))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            rng: SystemRandom::new(),
            ttl,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Open an unverified session for `user` and return its ID.
    pub fn open(&self, user: &User) -> Result<String, AppError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate session ID")))?;
        let session_id = URL_SAFE_NO_PAD.encode(bytes);

        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.is_live(now));
        self.evict_oldest_for(&user.uid);

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                user: user.clone(),
                state: VerificationState::signed_in(user.email.as_deref()),
                expires_at: now + self.ttl,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );

        tracing::debug!(uid = %user.uid, "Session opened");
        Ok(session_id)
    }

    /// Make room for one more session for `uid`.
    fn evict_oldest_for(&self, uid: &str) {
        let mut mine: Vec<(u64, String)> = self
            .sessions
            .iter()
            .filter(|entry| entry.user.uid == uid)
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect();

        if mine.len() < MAX_SESSIONS_PER_USER {
            return;
        }

        mine.sort();
        let excess = mine.len() + 1 - MAX_SESSIONS_PER_USER;
        for (_, session_id) in mine.into_iter().take(excess) {
            self.sessions.remove(&session_id);
        }
        tracing::debug!(uid, evicted = excess, "Evicted oldest sessions");
    }

    pub fn get(&self, session_id: &str) -> Option<SessionEntry> {
        self.sessions
            .get(session_id)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.get(session_id).is_some()
    }

    /// Fold a verification result into a session's state.
    ///
    /// Returns the updated state, or `None` if the session was closed while
    /// the query was in flight (the result is dropped).
    pub fn apply(
        &self,
        session_id: &str,
        result: &VerificationResult,
    ) -> Option<VerificationState> {
        let Some(mut entry) = self
            .sessions
            .get_mut(session_id)
            .filter(|entry| entry.is_live(Instant::now()))
        else {
            tracing::debug!("Verification finished for closed session, ignoring");
            return None;
        };
        entry.state.apply(result);
        Some(entry.state.clone())
    }

    /// Sign out. Returns true if the session existed.
    pub fn close(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
