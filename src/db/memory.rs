//! Process-local registration store.
//!
//! Backs the test suite and `STORE_BACKEND=memory` local runs. Each mutating
//! operation runs under a single write lock, which gives the same
//! all-or-nothing behavior as a Firestore transaction.

use crate::db::{RecordOutcome, RegistrationStore, TransitionOutcome};
use crate::error::AppError;
use crate::models::{NotificationEvent, Registration, RenewalAction, Threshold};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    registrations: HashMap<String, Registration>,
    events: Vec<NotificationEvent>,
    actions: Vec<RenewalAction>,
}

/// In-memory `RegistrationStore`.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `registrations`.
    pub fn with_registrations(registrations: impl IntoIterator<Item = Registration>) -> Self {
        let map = registrations
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                registrations: map,
                ..Default::default()
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every operation fails with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All notification events, in write order.
    pub async fn all_notification_events(&self) -> Vec<NotificationEvent> {
        self.inner.read().await.events.clone()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for InMemoryStore {
    async fn get_registration(&self, id: &str) -> Result<Option<Registration>, AppError> {
        self.check_available()?;
        Ok(self.inner.read().await.registrations.get(id).cloned())
    }

    async fn list_active_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut active: Vec<Registration> = inner
            .registrations
            .values()
            .filter(|r| !r.renewal_status.is_terminal())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>, AppError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut all: Vec<Registration> = inner.registrations.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn upsert_registration(&self, registration: &Registration) -> Result<(), AppError> {
        self.check_available()?;
        self.inner
            .write()
            .await
            .registrations
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn record_notification(
        &self,
        registration_id: &str,
        threshold: Threshold,
        events: &[NotificationEvent],
    ) -> Result<RecordOutcome, AppError> {
        self.check_available()?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut inner = self.inner.write().await;

        let registration = inner
            .registrations
            .get_mut(registration_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Registration {} not found", registration_id))
            })?;

        if !registration.record_threshold(threshold, &now) {
            return Ok(RecordOutcome::AlreadyNotified);
        }

        inner.events.extend_from_slice(events);
        Ok(RecordOutcome::Recorded)
    }

    async fn apply_renewal_action(
        &self,
        action: &RenewalAction,
    ) -> Result<TransitionOutcome, AppError> {
        self.check_available()?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut inner = self.inner.write().await;

        let registration = inner
            .registrations
            .get_mut(&action.registration_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Registration {} not found", action.registration_id))
            })?;

        let previous_status = registration.renewal_status;
        if !registration.apply_action(action, &now)? {
            return Ok(TransitionOutcome::Unchanged(registration.clone()));
        }

        let updated = registration.clone();
        let mut logged = action.clone();
        logged.previous_status = previous_status;
        logged.new_status = updated.renewal_status;
        inner.actions.push(logged);

        Ok(TransitionOutcome::Applied(updated))
    }

    async fn get_notification_events(
        &self,
        registration_id: &str,
    ) -> Result<Vec<NotificationEvent>, AppError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut events: Vec<NotificationEvent> = inner
            .events
            .iter()
            .filter(|e| e.registration_id == registration_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sent_at);
        Ok(events)
    }

    async fn get_renewal_actions(
        &self,
        registration_id: &str,
    ) -> Result<Vec<RenewalAction>, AppError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .actions
            .iter()
            .filter(|a| a.registration_id == registration_id)
            .cloned()
            .collect())
    }
}
