//! Signed-in identity as reported by the identity provider.

use serde::{Deserialize, Serialize};

/// Authenticated user. Owned by the identity provider; never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-unique subject ID
    pub uid: String,
    /// Email address (may be None if the provider did not share one)
    pub email: Option<String>,
}

impl User {
    /// Email to use for membership lookups; empty when none was shared.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}
