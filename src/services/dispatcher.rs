// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification dispatch with at-most-once recording.
//!
//! For each due (registration, threshold) pair:
//! 1. Take the per-registration lock (shared with status changes)
//! 2. Re-read the registration and re-check status and notified set
//! 3. Send on every channel concurrently, each bounded by a timeout
//! 4. If any channel succeeded, record the threshold and events atomically

use crate::db::{RecordOutcome, RegistrationStore};
use crate::error::AppError;
use crate::models::{Channel, NotificationEvent, RenewalStatus, Threshold};
use crate::services::channels::{ChannelError, Notice, NotificationChannel};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-registration locks, shared by the dispatcher and status mutator.
/// Entries are kept for the life of the process.
pub type RegistrationLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Get (or create) the lock for a registration.
pub fn registration_lock(locks: &RegistrationLocks, registration_id: &str) -> Arc<Mutex<()>> {
    locks
        .entry(registration_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Result of dispatching one threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered on these channels and recorded.
    Notified(Vec<Channel>),
    /// Already in the notified set; nothing sent.
    AlreadyNotified,
    /// Registration left `active` before sending; nothing sent.
    Suspended(RenewalStatus),
    /// No channel delivered (or the record could not be written).
    Failed,
}

pub struct NotificationDispatcher {
    store: Arc<dyn RegistrationStore>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    locks: RegistrationLocks,
    channel_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        locks: RegistrationLocks,
        channel_timeout: Duration,
    ) -> Self {
        if channels.is_empty() {
            tracing::warn!("No notification channels configured; notices cannot be delivered");
        }
        Self {
            store,
            channels,
            locks,
            channel_timeout,
        }
    }

    pub fn channels(&self) -> &[Arc<dyn NotificationChannel>] {
        &self.channels
    }

    /// Upper bound on a single channel call.
    pub fn channel_timeout(&self) -> Duration {
        self.channel_timeout
    }

    /// Dispatch `thresholds` for one registration, in order.
    ///
    /// Returns one outcome per requested threshold. Fails only if the
    /// registration cannot be read.
    pub async fn dispatch(
        &self,
        registration_id: &str,
        thresholds: &[Threshold],
        today: NaiveDate,
    ) -> Result<Vec<(Threshold, DispatchOutcome)>, AppError> {
        let lock = registration_lock(&self.locks, registration_id);
        let _guard = lock.lock().await;

        let registration = self
            .store
            .get_registration(registration_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Registration {} not found", registration_id))
            })?;

        let mut outcomes = Vec::with_capacity(thresholds.len());

        for &threshold in thresholds {
            if registration.renewal_status.is_terminal() {
                outcomes.push((
                    threshold,
                    DispatchOutcome::Suspended(registration.renewal_status),
                ));
                continue;
            }

            if registration.notified_thresholds.contains(&threshold) {
                outcomes.push((threshold, DispatchOutcome::AlreadyNotified));
                continue;
            }

            let Some(notice) = Notice::new(&registration, threshold, today) else {
                outcomes.push((threshold, DispatchOutcome::Failed));
                continue;
            };

            let outcome = self.deliver_and_record(&notice).await;
            outcomes.push((threshold, outcome));
        }

        Ok(outcomes)
    }

    async fn deliver_and_record(&self, notice: &Notice) -> DispatchOutcome {
        if self.channels.is_empty() {
            tracing::warn!(
                registration_id = %notice.registration_id,
                threshold = %notice.threshold,
                "No channels configured; notice not sent"
            );
            return DispatchOutcome::Failed;
        }

        let delivered = self.send_all(notice).await;
        if delivered.is_empty() {
            tracing::warn!(
                registration_id = %notice.registration_id,
                threshold = %notice.threshold,
                "All channels failed; will retry next pass"
            );
            return DispatchOutcome::Failed;
        }

        let sent_at = chrono::Utc::now();
        let events: Vec<NotificationEvent> = delivered
            .iter()
            .map(|&channel| NotificationEvent {
                registration_id: notice.registration_id.clone(),
                threshold: notice.threshold,
                channel,
                sent_at,
            })
            .collect();

        match self
            .store
            .record_notification(&notice.registration_id, notice.threshold, &events)
            .await
        {
            Ok(RecordOutcome::Recorded) => {
                tracing::info!(
                    registration_id = %notice.registration_id,
                    threshold = %notice.threshold,
                    channels = ?delivered,
                    "Renewal notice sent"
                );
                DispatchOutcome::Notified(delivered)
            }
            Ok(RecordOutcome::AlreadyNotified) => {
                tracing::warn!(
                    registration_id = %notice.registration_id,
                    threshold = %notice.threshold,
                    "Threshold recorded concurrently by another writer"
                );
                DispatchOutcome::AlreadyNotified
            }
            Err(e) => {
                tracing::error!(
                    registration_id = %notice.registration_id,
                    threshold = %notice.threshold,
                    error = %e,
                    "Notice delivered but not recorded"
                );
                DispatchOutcome::Failed
            }
        }
    }

    /// Send on all channels concurrently. Returns the channels that succeeded.
    async fn send_all(&self, notice: &Notice) -> Vec<Channel> {
        let sends = self.channels.iter().map(|channel| async move {
            let result = match tokio::time::timeout(
                self.channel_timeout,
                channel.send_notice(notice),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(self.channel_timeout)),
            };
            (channel.kind(), result)
        });

        let mut delivered = Vec::new();
        for (kind, result) in futures_util::future::join_all(sends).await {
            match result {
                Ok(()) => delivered.push(kind),
                Err(e) => {
                    tracing::warn!(
                        registration_id = %notice.registration_id,
                        threshold = %notice.threshold,
                        channel = %kind,
                        error = %e,
                        "Channel delivery failed"
                    );
                }
            }
        }
        delivered
    }
}
