// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance code decoding and recording.
//!
//! An attendance code is the text payload of an event's QR code:
//!
//! ```text
//!   0   2   4   6   8
//!   | PP| DD| MM| YY| event name ...
//! ```
//!
//! Offsets are character offsets. The fixed fields are opaque display
//! strings; no numeric or calendar validation is performed.

use crate::db::ClubStore;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Payload reported by the device when the QR decoder found nothing readable.
pub const UNRECOGNIZED_SENTINEL: &str = "empty";

/// Width of the points/day/month/year prefix.
const FIXED_WIDTH: usize = 8;

/// Why a scanned payload could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("attendance code is shorter than 8 characters")]
    Malformed,
    #[error("no readable code in the captured image")]
    Unrecognized,
}

/// Display fields of a decoded attendance code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DecodedEvent {
    pub event_name: String,
    pub month: String,
    pub day: String,
    pub year: String,
    pub points: String,
}

impl DecodedEvent {
    /// Human-readable confirmation line.
    pub fn summary(&self) -> String {
        let unit = if self.points == "1" { "point" } else { "points" };
        format!(
            "{} on {}/{}/{} for {} {}",
            self.event_name, self.month, self.day, self.year, self.points, unit
        )
    }
}

/// Decode a scanned attendance code into its display fields.
pub fn decode(raw: &str) -> Result<DecodedEvent, DecodeError> {
    if raw == UNRECOGNIZED_SENTINEL {
        return Err(DecodeError::Unrecognized);
    }

    // Byte offsets of the first FIXED_WIDTH + 1 character boundaries.
    let bounds: Vec<usize> = raw
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(raw.len()))
        .take(FIXED_WIDTH + 1)
        .collect();

    if bounds.len() <= FIXED_WIDTH {
        return Err(DecodeError::Malformed);
    }

    let field = |n: usize| &raw[bounds[n]..bounds[n + 2]];

    Ok(DecodedEvent {
        points: drop_leading_zero(field(0)).to_string(),
        day: drop_leading_zero(field(2)).to_string(),
        month: drop_leading_zero(field(4)).to_string(),
        year: field(6).to_string(),
        event_name: raw[bounds[FIXED_WIDTH]..].to_string(),
    })
}

/// Display transform for two-character fields: "05" shows as "5".
fn drop_leading_zero(field: &str) -> &str {
    field.strip_prefix('0').unwrap_or(field)
}

/// Outcome of recording one attendee against one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    Recorded,
    /// The session has no email to record.
    NoIdentity,
    /// The store rejected the write. Not retried.
    WriteFailed(String),
}

/// Add `attendee_email` to the attendee set of the event keyed by `event_code`.
///
/// The event document is not checked for existence first.
pub async fn record_attendance(
    store: &dyn ClubStore,
    event_code: &str,
    attendee_email: &str,
) -> RecordResult {
    if attendee_email.is_empty() {
        tracing::warn!(event_code, "Refusing to record attendance without an email");
        return RecordResult::NoIdentity;
    }

    match store.add_attendee(event_code, attendee_email).await {
        Ok(()) => {
            tracing::info!(event_code, email = attendee_email, "Attendance recorded");
            RecordResult::Recorded
        }
        Err(e) => {
            tracing::error!(event_code, error = %e, "Attendance write failed");
            RecordResult::WriteFailed(e.to_string())
        }
    }
}

// ─── Scan Flow ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanFlowError {
    #[error("cannot {action} while scan is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// One pass through the scan screen.
///
/// `Idle -> ImageCaptured -> Decoded -> Recorded`, or
/// `Idle -> ImageCaptured -> DecodeFailed`. Both ends are terminal until
/// [`ScanFlow::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanFlow {
    #[default]
    Idle,
    ImageCaptured {
        payload: String,
    },
    Decoded {
        code: String,
        event: DecodedEvent,
    },
    Recorded {
        code: String,
        event: DecodedEvent,
    },
    DecodeFailed(DecodeError),
}

impl ScanFlow {
    pub fn state_name(&self) -> &'static str {
        match self {
            ScanFlow::Idle => "idle",
            ScanFlow::ImageCaptured { .. } => "image_captured",
            ScanFlow::Decoded { .. } => "decoded",
            ScanFlow::Recorded { .. } => "recorded",
            ScanFlow::DecodeFailed(_) => "decode_failed",
        }
    }

    fn invalid(&self, action: &'static str) -> ScanFlowError {
        ScanFlowError::InvalidTransition {
            state: self.state_name(),
            action,
        }
    }

    /// Accept the decoder's first payload; `None` means nothing was readable.
    pub fn capture(&mut self, payload: Option<String>) -> Result<(), ScanFlowError> {
        if *self != ScanFlow::Idle {
            return Err(self.invalid("capture"));
        }
        *self = ScanFlow::ImageCaptured {
            payload: payload.unwrap_or_else(|| UNRECOGNIZED_SENTINEL.to_string()),
        };
        Ok(())
    }

    /// Decode the captured payload.
    ///
    /// The outer error is an out-of-order call; the inner result is the
    /// decode outcome, which is also reflected in the new state.
    pub fn decode(&mut self) -> Result<Result<DecodedEvent, DecodeError>, ScanFlowError> {
        let ScanFlow::ImageCaptured { payload } = self else {
            return Err(self.invalid("decode"));
        };

        let outcome = decode(payload);
        *self = match &outcome {
            Ok(event) => ScanFlow::Decoded {
                code: std::mem::take(payload),
                event: event.clone(),
            },
            Err(e) => ScanFlow::DecodeFailed(*e),
        };
        Ok(outcome)
    }

    /// Record the decoded event for `attendee_email`.
    ///
    /// Only a successful write moves the flow to `Recorded`; otherwise it
    /// stays `Decoded` so the user can retry.
    pub async fn record(
        &mut self,
        store: &dyn ClubStore,
        attendee_email: &str,
    ) -> Result<RecordResult, ScanFlowError> {
        let ScanFlow::Decoded { code, event } = self else {
            return Err(self.invalid("record"));
        };

        let result = record_attendance(store, code, attendee_email).await;
        if result == RecordResult::Recorded {
            *self = ScanFlow::Recorded {
                code: std::mem::take(code),
                event: event.clone(),
            };
        }
        Ok(result)
    }

    pub fn reset(&mut self) {
        *self = ScanFlow::Idle;
    }
}
