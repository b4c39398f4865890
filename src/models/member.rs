// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Membership record model (read-only).

use serde::{Deserialize, Serialize};

/// A registered club member stored in the `users` collection.
///
/// Only the fields this service reads are modelled; anything else on the
/// document is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Opaque Firestore document ID
    #[serde(alias = "_firestore_id", default)]
    pub doc_id: Option<String>,
    /// Lookup key
    #[serde(default)]
    pub email: String,
}
