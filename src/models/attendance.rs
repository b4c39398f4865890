// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event attendance model.

use serde::{Deserialize, Serialize};

/// Name of the attendee list field on an event document.
pub const ATTENDEES_FIELD: &str = "Attendees";

/// An event document in the `activity points` collection.
///
/// Keyed by the scanned attendance code. Other fields on the document
/// (event name, points) are managed by officers and ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Attendee emails, kept duplicate-free by set-union writes
    #[serde(rename = "Attendees", default)]
    pub attendees: Vec<String>,
}

impl AttendanceRecord {
    /// Add an attendee unless already present. Returns true if added.
    pub fn union_attendee(&mut self, email: &str) -> bool {
        if self.attendees.iter().any(|a| a == email) {
            return false;
        }
        self.attendees.push(email.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_attendee_keeps_single_entry() {
        let mut record = AttendanceRecord::default();
        assert!(record.union_attendee("a@x.com"));
        assert!(!record.union_attendee("a@x.com"));
        assert!(record.union_attendee("b@x.com"));
        assert_eq!(record.attendees, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn deserializes_capitalized_field() {
        let record: AttendanceRecord =
            serde_json::from_str(r#"{"Attendees":["a@x.com"],"event":"Gala","points":5}"#)
                .unwrap();
        assert_eq!(record.attendees, vec!["a@x.com"]);
    }
}
