// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled renewal check: evaluate all active registrations and dispatch
//! due notices. Also produces the daily portfolio summary.

use crate::db::RegistrationStore;
use crate::error::AppError;
use crate::models::{Channel, Threshold};
use crate::services::channels::{ChannelError, ExpirySummary};
use crate::services::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::services::evaluator::{count_expiring, evaluate, Evaluation};
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Registrations dispatched in parallel during a pass.
pub const MAX_CONCURRENT_DISPATCHES: usize = 8;

/// Counters for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PassReport {
    pub date: NaiveDate,
    pub registrations_scanned: usize,
    /// (registration, threshold) pairs found due
    pub due_pairs: usize,
    pub notified: usize,
    pub already_notified: usize,
    pub failed: usize,
    /// Pairs skipped because the registration left `active` mid-pass,
    /// plus listed registrations that were not active
    pub suspended: usize,
    /// Active registrations with a missing or past expiry date
    pub overdue: usize,
    /// IDs of the overdue registrations, for operator follow-up
    pub overdue_registrations: Vec<String>,
}

impl PassReport {
    fn new(date: NaiveDate, registrations_scanned: usize) -> Self {
        Self {
            date,
            registrations_scanned,
            due_pairs: 0,
            notified: 0,
            already_notified: 0,
            failed: 0,
            suspended: 0,
            overdue: 0,
            overdue_registrations: Vec::new(),
        }
    }
}

/// Daily summary delivery result.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    #[serde(flatten)]
    pub summary: ExpirySummary,
    pub delivered: Vec<Channel>,
}

pub struct RenewalCheck {
    store: Arc<dyn RegistrationStore>,
    dispatcher: Arc<NotificationDispatcher>,
    running: Mutex<()>,
}

impl RenewalCheck {
    pub fn new(store: Arc<dyn RegistrationStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            running: Mutex::new(()),
        }
    }

    /// Run one pass for `today`.
    ///
    /// Rejects an overlapping pass with `PassInProgress`. A listing failure
    /// aborts with `DataUnavailable` before anything is sent.
    pub async fn run_pass(&self, today: NaiveDate) -> Result<PassReport, AppError> {
        let _guard = self.running.try_lock().map_err(|_| AppError::PassInProgress)?;

        let registrations = self
            .store
            .list_active_registrations()
            .await
            .map_err(|e| AppError::DataUnavailable(e.to_string()))?;

        let mut report = PassReport::new(today, registrations.len());

        let mut work: Vec<(String, Vec<Threshold>)> = Vec::new();
        for registration in &registrations {
            match evaluate(today, registration) {
                Evaluation::Due(thresholds) if thresholds.is_empty() => {}
                Evaluation::Due(thresholds) => {
                    report.due_pairs += thresholds.len();
                    work.push((registration.id.clone(), thresholds));
                }
                Evaluation::Overdue(reason) => {
                    tracing::warn!(
                        registration_id = %registration.id,
                        reason = ?reason,
                        "Active registration overdue"
                    );
                    report.overdue += 1;
                    report.overdue_registrations.push(registration.id.clone());
                }
                Evaluation::Suspended(_) => report.suspended += 1,
            }
        }

        let dispatcher = &self.dispatcher;
        let results: Vec<_> = stream::iter(work)
            .map(|(registration_id, thresholds)| async move {
                let result = dispatcher
                    .dispatch(&registration_id, &thresholds, today)
                    .await;
                (registration_id, thresholds.len(), result)
            })
            .buffer_unordered(MAX_CONCURRENT_DISPATCHES)
            .collect()
            .await;

        for (registration_id, pairs, result) in results {
            match result {
                Ok(outcomes) => {
                    for (_, outcome) in outcomes {
                        match outcome {
                            DispatchOutcome::Notified(_) => report.notified += 1,
                            DispatchOutcome::AlreadyNotified => report.already_notified += 1,
                            DispatchOutcome::Suspended(_) => report.suspended += 1,
                            DispatchOutcome::Failed => report.failed += 1,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        registration_id = %registration_id,
                        error = %e,
                        "Dispatch failed for registration"
                    );
                    report.failed += pairs;
                }
            }
        }

        tracing::info!(
            date = %today,
            scanned = report.registrations_scanned,
            due = report.due_pairs,
            notified = report.notified,
            already_notified = report.already_notified,
            failed = report.failed,
            suspended = report.suspended,
            overdue = report.overdue,
            "Renewal check pass complete"
        );

        Ok(report)
    }

    /// Count expiring registrations and send the summary on every channel
    /// that carries summaries.
    pub async fn send_daily_summary(&self, today: NaiveDate) -> Result<SummaryReport, AppError> {
        let registrations = self
            .store
            .list_active_registrations()
            .await
            .map_err(|e| AppError::DataUnavailable(e.to_string()))?;

        let summary = ExpirySummary {
            date: today,
            counts: count_expiring(today, registrations.iter()),
        };

        let timeout = self.dispatcher.channel_timeout();
        let mut delivered = Vec::new();
        let mut errors = Vec::new();
        for channel in self.dispatcher.channels() {
            let result = tokio::time::timeout(timeout, channel.send_summary(&summary))
                .await
                .unwrap_or(Err(ChannelError::Timeout(timeout)));
            match result {
                Ok(()) => delivered.push(channel.kind()),
                Err(ChannelError::Unsupported) => {}
                Err(e) => {
                    tracing::warn!(channel = %channel.kind(), error = %e, "Summary delivery failed");
                    errors.push(format!("{}: {}", channel.kind(), e));
                }
            }
        }

        if delivered.is_empty() {
            let details = if errors.is_empty() {
                "no channel delivers summaries".to_string()
            } else {
                errors.join("; ")
            };
            return Err(AppError::Channel(details));
        }

        tracing::info!(
            date = %today,
            within_30 = summary.counts.within_30,
            within_90 = summary.counts.within_90,
            within_180 = summary.counts.within_180,
            "Daily summary sent"
        );

        Ok(SummaryReport { summary, delivered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{Registration, RenewalStatus};
    use crate::services::channels::{Notice, NotificationChannel};
    use async_trait::async_trait;
    use chrono::Duration;
    use dashmap::DashMap;
    use std::collections::BTreeSet;

    struct OkChannel;

    #[async_trait]
    impl NotificationChannel for OkChannel {
        fn kind(&self) -> Channel {
            Channel::Email
        }

        async fn send_notice(&self, _notice: &Notice) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn registration(id: &str, days: Option<i64>) -> Registration {
        Registration {
            id: id.to_string(),
            trademark_name: id.to_uppercase(),
            territory: "Georgia".to_string(),
            registration_number: None,
            application_number: None,
            expiry_date: days.map(|d| today() + Duration::days(d)),
            renewal_status: RenewalStatus::Active,
            notified_thresholds: BTreeSet::new(),
            renewal_filed_date: None,
            renewal_decision_date: None,
            renewal_notes: None,
            updated_at: String::new(),
        }
    }

    fn check(store: Arc<InMemoryStore>) -> RenewalCheck {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            vec![Arc::new(OkChannel) as Arc<dyn NotificationChannel>],
            Arc::new(DashMap::new()),
            std::time::Duration::from_secs(1),
        ));
        RenewalCheck::new(store, dispatcher)
    }

    #[tokio::test]
    async fn test_pass_counts() {
        let store = Arc::new(InMemoryStore::with_registrations([
            registration("a", Some(150)),
            registration("b", Some(10)),
            registration("c", Some(400)),
            registration("d", Some(-5)),
            registration("e", None),
        ]));
        let check = check(store);

        let report = check.run_pass(today()).await.unwrap();

        assert_eq!(report.registrations_scanned, 5);
        assert_eq!(report.due_pairs, 4);
        assert_eq!(report.notified, 4);
        assert_eq!(report.overdue, 2);
        let mut overdue = report.overdue_registrations.clone();
        overdue.sort();
        assert_eq!(overdue, vec!["d", "e"]);
        assert_eq!(report.failed, 0);

        let again = check.run_pass(today()).await.unwrap();
        assert_eq!(again.due_pairs, 0);
        assert_eq!(again.notified, 0);
    }

    #[tokio::test]
    async fn test_store_outage_aborts_pass() {
        let store = Arc::new(InMemoryStore::with_registrations([registration(
            "a",
            Some(150),
        )]));
        store.set_unavailable(true);
        let check = check(store.clone());

        let err = check.run_pass(today()).await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));

        store.set_unavailable(false);
        assert!(store.all_notification_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_pass_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let check = check(store);

        let _held = check.running.lock().await;
        let err = check.run_pass(today()).await.unwrap_err();
        assert!(matches!(err, AppError::PassInProgress));
    }

    struct StalledBot;

    #[async_trait]
    impl NotificationChannel for StalledBot {
        fn kind(&self) -> Channel {
            Channel::MessagingBot
        }

        async fn send_notice(&self, _notice: &Notice) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn send_summary(&self, _summary: &ExpirySummary) -> Result<(), ChannelError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stalled_summary_channel_times_out() {
        let store = Arc::new(InMemoryStore::with_registrations([registration(
            "a",
            Some(20),
        )]));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            vec![Arc::new(StalledBot) as Arc<dyn NotificationChannel>],
            Arc::new(DashMap::new()),
            std::time::Duration::from_millis(200),
        ));
        let check = RenewalCheck::new(store, dispatcher);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            check.send_daily_summary(today()),
        )
        .await
        .expect("summary should give up after the channel timeout");

        match result {
            Err(AppError::Channel(details)) => assert!(details.contains("timed out")),
            other => panic!("expected channel error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_summary_without_summary_channel_fails() {
        let store = Arc::new(InMemoryStore::with_registrations([registration(
            "a",
            Some(20),
        )]));
        let check = check(store);

        let err = check.send_daily_summary(today()).await.unwrap_err();
        assert!(matches!(err, AppError::Channel(_)));
    }
}
