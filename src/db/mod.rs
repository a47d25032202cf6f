//! Registration store: the storage seam for the notice lifecycle.
//!
//! Implementations:
//! - `FirestoreDb` (production)
//! - `InMemoryStore` (tests and local development)
//!
//! `seed` loads registrations from a JSON export into either backend.

pub mod firestore;
pub mod memory;
pub mod seed;

pub use firestore::FirestoreDb;
pub use memory::InMemoryStore;
pub use seed::{seed_from_file, SeedError};

use crate::error::AppError;
use crate::models::{NotificationEvent, Registration, RenewalAction, Threshold};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const REGISTRATIONS: &str = "trademark_registrations";
    /// Dispatched notices (one per channel delivery)
    pub const NOTIFICATION_EVENTS: &str = "notification_events";
    pub const RENEWAL_ACTIONS: &str = "renewal_actions";
}

/// Result of recording a successful notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Threshold added to the notified set and events written.
    Recorded,
    /// Threshold was already present; nothing written.
    AlreadyNotified,
}

/// Result of applying an operator renewal action.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Status changed and the action was logged.
    Applied(Registration),
    /// Registration was already in the requested state; nothing written.
    Unchanged(Registration),
}

impl TransitionOutcome {
    pub fn registration(&self) -> &Registration {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::Unchanged(r) => r,
        }
    }

    pub fn into_registration(self) -> Registration {
        match self {
            TransitionOutcome::Applied(r) | TransitionOutcome::Unchanged(r) => r,
        }
    }
}

/// Persistence operations consumed by the notice lifecycle.
///
/// The two mutating operations are read-modify-write on a single
/// registration and must commit atomically.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError>;

    /// All registrations whose renewal status is `active`.
    async fn list_active_registrations(&self) -> Result<Vec<Registration>, AppError>;

    async fn list_registrations(&self) -> Result<Vec<Registration>, AppError>;

    /// Create or replace a registration (used by `seed_from_file`).
    async fn upsert_registration(&self, registration: &Registration) -> Result<(), AppError>;

    /// Append `threshold` to the notified set and write `events`, atomically.
    ///
    /// Idempotent: if the threshold is already recorded nothing is written.
    async fn record_notification(
        &self,
        registration_id: &str,
        threshold: Threshold,
        events: &[NotificationEvent],
    ) -> Result<RecordOutcome, AppError>;

    /// Apply a renewal action and append it to the action log, atomically.
    ///
    /// Fails with `NotFound` or `InvalidStateTransition`.
    async fn apply_renewal_action(
        &self,
        action: &RenewalAction,
    ) -> Result<TransitionOutcome, AppError>;

    /// Notification events for a registration, oldest first.
    async fn get_notification_events(
        &self,
        registration_id: &str,
    ) -> Result<Vec<NotificationEvent>, AppError>;

    /// Renewal actions for a registration, oldest first.
    async fn get_renewal_actions(
        &self,
        registration_id: &str,
    ) -> Result<Vec<RenewalAction>, AppError>;
}
