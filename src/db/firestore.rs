// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Registrations (expiry, renewal status, notified thresholds)
//! - Notification events (one per delivered notice)
//! - Renewal actions (operator decision log)

use crate::db::{collections, RecordOutcome, RegistrationStore, TransitionOutcome};
use crate::error::AppError;
use crate::models::{NotificationEvent, Registration, RenewalAction, RenewalStatus, Threshold};
use async_trait::async_trait;

/// Registration fields owned by notice recording.
const NOTIFIED_FIELDS: [&str; 2] = ["notified_thresholds", "updated_at"];

/// Registration fields owned by operator renewal actions.
const STATUS_FIELDS: [&str; 5] = [
    "renewal_status",
    "renewal_filed_date",
    "renewal_decision_date",
    "renewal_notes",
    "updated_at",
];

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Client whose reads run inside `transaction`.
    ///
    /// A read through this client registers the document for conflict
    /// detection, so a concurrent commit from another instance aborts ours.
    fn transaction_reader(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn read_registration(
        client: &firestore::FirestoreDb,
        id: &str,
    ) -> Result<Option<Registration>, AppError> {
        client
            .fluent()
            .select()
            .by_id_in(collections::REGISTRATIONS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl RegistrationStore for FirestoreDb {
    // ─── Registration Reads ──────────────────────────────────────

    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError> {
        Self::read_registration(self.get_client()?, id).await
    }

    async fn list_active_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .filter(|q| q.field("renewal_status").eq(RenewalStatus::Active.as_str()))
            .order_by([("expiry_date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REGISTRATIONS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_registration(&self, registration: &Registration) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(registration)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Atomic Notice Recording ─────────────────────────────────

    /// Record a delivered notice: notified-set update plus events, in one
    /// transaction. Only `notified_thresholds` and `updated_at` are written,
    /// so a status change committed elsewhere is never overwritten.
    async fn record_notification(
        &self,
        registration_id: &str,
        threshold: Threshold,
        events: &[NotificationEvent],
    ) -> Result<RecordOutcome, AppError> {
        let client = self.get_client()?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let reader = Self::transaction_reader(client, &transaction);
        let mut registration = match Self::read_registration(&reader, registration_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "Registration {} not found",
                    registration_id
                )));
            }
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        if !registration.record_threshold(threshold, &now) {
            tracing::debug!(
                registration_id,
                threshold = %threshold,
                "Threshold already notified (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(RecordOutcome::AlreadyNotified);
        }

        client
            .fluent()
            .update()
            .fields(NOTIFIED_FIELDS)
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(&registration)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add registration to transaction: {}",
                    e
                ))
            })?;

        for event in events {
            client
                .fluent()
                .update()
                .in_col(collections::NOTIFICATION_EVENTS)
                .document_id(event.doc_id())
                .object(event)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add event to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            registration_id,
            threshold = %threshold,
            events = events.len(),
            "Notice recorded atomically"
        );

        Ok(RecordOutcome::Recorded)
    }

    // ─── Atomic Status Transition ────────────────────────────────

    async fn apply_renewal_action(
        &self,
        action: &RenewalAction,
    ) -> Result<TransitionOutcome, AppError> {
        let client = self.get_client()?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let reader = Self::transaction_reader(client, &transaction);
        let mut registration = match Self::read_registration(&reader, &action.registration_id).await
        {
            Ok(Some(r)) => r,
            Ok(None) => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!(
                    "Registration {} not found",
                    action.registration_id
                )));
            }
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        let previous_status = registration.renewal_status;
        let changed = match registration.apply_action(action, &now) {
            Ok(changed) => changed,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        if !changed {
            let _ = transaction.rollback().await;
            return Ok(TransitionOutcome::Unchanged(registration));
        }

        let mut logged = action.clone();
        logged.previous_status = previous_status;
        logged.new_status = registration.renewal_status;

        client
            .fluent()
            .update()
            .fields(STATUS_FIELDS)
            .in_col(collections::REGISTRATIONS)
            .document_id(&registration.id)
            .object(&registration)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add registration to transaction: {}",
                    e
                ))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::RENEWAL_ACTIONS)
            .document_id(logged.doc_id())
            .object(&logged)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add action to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(TransitionOutcome::Applied(registration))
    }

    // ─── History ─────────────────────────────────────────────────

    async fn get_notification_events(
        &self,
        registration_id: &str,
    ) -> Result<Vec<NotificationEvent>, AppError> {
        let registration_id = registration_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATION_EVENTS)
            .filter(move |q| q.field("registration_id").eq(registration_id.clone()))
            .order_by([("sent_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_renewal_actions(
        &self,
        registration_id: &str,
    ) -> Result<Vec<RenewalAction>, AppError> {
        let registration_id = registration_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RENEWAL_ACTIONS)
            .filter(move |q| q.field("registration_id").eq(registration_id.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
