// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod identity;
pub mod member;
pub mod session;

pub use attendance::AttendanceRecord;
pub use identity::User;
pub use member::MembershipRecord;
pub use session::{ScanGate, VerificationOutcome, VerificationState};
