// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod attendance;
pub mod google_identity;
pub mod session;
pub mod verifier;

pub use attendance::{decode, record_attendance, DecodeError, DecodedEvent, RecordResult, ScanFlow};
pub use google_identity::{GoogleIdentityVerifier, IdentityError};
pub use session::{SessionEntry, SessionRegistry, MAX_SESSIONS_PER_USER};
pub use verifier::{MembershipVerifier, VerificationResult};
