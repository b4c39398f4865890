// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-session membership verification state.

use crate::services::verifier::VerificationResult;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Outcome of the most recent verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    Unverified,
    QueryFailed,
}

/// Whether the scan flow may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanGate {
    Open,
    /// `sign_out` is set when the identity is known not to be a member.
    Denied { sign_out: bool },
}

/// In-memory verification state, scoped to one signed-in session.
///
/// Starts unverified. Only a completed membership query changes `verified`
/// or `checked`; a failed query is recorded in `last_outcome` but leaves the
/// rest as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationState {
    pub verified: bool,
    pub display_email: String,
    /// Outcome of the most recent attempt, completed or not.
    pub last_outcome: Option<VerificationOutcome>,
    /// Set once any membership query has completed for this session.
    pub checked: bool,
}

impl VerificationState {
    /// Fresh state for a newly signed-in identity.
    pub fn signed_in(email: Option<&str>) -> Self {
        Self {
            verified: false,
            display_email: email.unwrap_or_default().to_string(),
            last_outcome: None,
            checked: false,
        }
    }

    /// Fold a verification result into the state.
    pub fn apply(&mut self, result: &VerificationResult) {
        match result {
            VerificationResult::Verified(display_name) => {
                self.verified = true;
                self.checked = true;
                self.display_email = display_name.clone();
                self.last_outcome = Some(VerificationOutcome::Verified);
            }
            VerificationResult::Unverified => {
                self.verified = false;
                self.checked = true;
                self.last_outcome = Some(VerificationOutcome::Unverified);
            }
            VerificationResult::QueryFailed(_) => {
                self.last_outcome = Some(VerificationOutcome::QueryFailed);
            }
        }
    }

    /// Consult the last known state before opening the scanner.
    pub fn gate(&self) -> ScanGate {
        if self.verified {
            return ScanGate::Open;
        }
        // A failed query never overrides a completed negative result.
        let unreachable_since_sign_in =
            !self.checked && self.last_outcome == Some(VerificationOutcome::QueryFailed);
        ScanGate::Denied {
            sign_out: !unreachable_since_sign_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_unverified_and_denied_with_sign_out() {
        let state = VerificationState::signed_in(Some("a@x.com"));
        assert!(!state.verified);
        assert_eq!(state.display_email, "a@x.com");
        assert_eq!(state.gate(), ScanGate::Denied { sign_out: true });
    }

    #[test]
    fn verified_result_opens_gate() {
        let mut state = VerificationState::signed_in(Some("a@x.com"));
        state.apply(&VerificationResult::Verified("a@x.com".to_string()));
        assert!(state.verified);
        assert_eq!(state.gate(), ScanGate::Open);
    }

    #[test]
    fn unverified_result_denies_with_sign_out() {
        let mut state = VerificationState::signed_in(Some("b@x.com"));
        state.apply(&VerificationResult::Unverified);
        assert!(!state.verified);
        assert_eq!(state.gate(), ScanGate::Denied { sign_out: true });
    }

    #[test]
    fn query_failure_denies_without_sign_out() {
        let mut state = VerificationState::signed_in(Some("a@x.com"));
        state.apply(&VerificationResult::QueryFailed("unavailable".to_string()));
        assert!(!state.verified);
        assert_eq!(state.gate(), ScanGate::Denied { sign_out: false });
    }

    #[test]
    fn query_failure_keeps_prior_verified_flag() {
        let mut state = VerificationState::signed_in(Some("a@x.com"));
        state.apply(&VerificationResult::Verified("a@x.com".to_string()));
        state.apply(&VerificationResult::QueryFailed("timeout".to_string()));

        assert!(state.verified);
        assert_eq!(state.display_email, "a@x.com");
        assert_eq!(state.last_outcome, Some(VerificationOutcome::QueryFailed));
        assert_eq!(state.gate(), ScanGate::Open);
    }

    #[test]
    fn query_failure_does_not_hide_negative_result() {
        let mut state = VerificationState::signed_in(Some("b@x.com"));
        state.apply(&VerificationResult::Unverified);
        state.apply(&VerificationResult::QueryFailed("unavailable".to_string()));

        assert!(!state.verified);
        assert!(state.checked);
        assert_eq!(state.last_outcome, Some(VerificationOutcome::QueryFailed));
        assert_eq!(state.gate(), ScanGate::Denied { sign_out: true });
    }
}
