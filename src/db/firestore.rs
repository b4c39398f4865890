// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (membership lookup by email)
//! - Activity points (event attendee lists)

use crate::db::{collections, ClubStore};
use crate::error::AppError;
use crate::models::attendance::ATTENDEES_FIELD;
use crate::models::{AttendanceRecord, MembershipRecord};
use async_trait::async_trait;

const EMAIL_FIELD: &str = "email";

/// Unsigned token the emulator accepts in place of real credentials.
const EMULATOR_TOKEN: &str = "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0.";

/// Firestore database client.
///
/// `client` is `None` in offline mode, where every operation fails with
/// [`AppError::Database`].
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Connect to Firestore for `project_id`.
    ///
    /// With FIRESTORE_EMULATOR_HOST set, connects to the emulator without
    /// credential discovery.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        let emulator = std::env::var("FIRESTORE_EMULATOR_HOST").is_ok();

        let client = if emulator {
            Self::connect_emulator(project_id).await?
        } else {
            firestore::FirestoreDb::new(project_id)
                .await
                .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?
        };

        tracing::info!(project = project_id, emulator, "Connected to Firestore");
        Ok(Self {
            client: Some(client),
        })
    }

    async fn connect_emulator(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(EMULATOR_TOKEN.to_string().into()),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        firestore::FirestoreDb::with_options_token_source(
            firestore::FirestoreDbOptions::new(project_id.to_string()),
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e)))
    }

    /// Offline client for tests; all operations return errors.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Firestore offline".to_string()))
    }

    // ─── Membership Operations ───────────────────────────────────

    /// Find every membership document whose `email` equals `email`.
    pub async fn get_members_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<MembershipRecord>, AppError> {
        self.client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field(EMAIL_FIELD).eq(email)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Attendance Operations ───────────────────────────────────

    /// Get an event's attendee document by attendance code.
    pub async fn get_attendance(
        &self,
        event_code: &str,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        self.client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITY_POINTS)
            .obj()
            .one(event_code)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append an attendee with array-union semantics.
    ///
    /// Runs as a transform-only write so concurrent scans of the same event
    /// never overwrite each other's entries. No existence precondition is set.
    pub async fn union_attendee(&self, event_code: &str, email: &str) -> Result<(), AppError> {
        let client = self.client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::ACTIVITY_POINTS)
            .document_id(event_code)
            .transforms(|t| {
                t.fields([t
                    .field(ATTENDEES_FIELD)
                    .append_missing_elements([email.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add attendee to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(event_code, "Attendee union committed");
        Ok(())
    }
}

#[async_trait]
impl ClubStore for FirestoreDb {
    async fn find_members_by_email(&self, email: &str) -> Result<Vec<MembershipRecord>, AppError> {
        self.get_members_by_email(email).await
    }

    async fn add_attendee(&self, event_code: &str, email: &str) -> Result<(), AppError> {
        self.union_attendee(event_code, email).await
    }
}
