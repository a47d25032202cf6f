// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side queries over registrations and notice history.

use crate::db::RegistrationStore;
use crate::error::AppError;
use crate::models::{Registration, RenewalStatus, Threshold};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest date range accepted by the notices report.
pub const MAX_REPORT_RANGE_DAYS: i64 = 731;

/// One threshold crossing inside the report range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ThresholdNotice {
    pub threshold: Threshold,
    pub crossing_date: NaiveDate,
    pub notified: bool,
    /// Earliest delivery across channels
    pub notified_at: Option<DateTime<Utc>>,
}

/// A registration with the crossings that fall in the report range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegistrationNotices {
    pub registration_id: String,
    pub trademark_name: String,
    pub territory: String,
    pub number: String,
    pub expiry_date: NaiveDate,
    pub renewal_status: RenewalStatus,
    pub notices: Vec<ThresholdNotice>,
}

/// Registrations with at least one threshold crossing in `[from, to]`.
///
/// Sorted by earliest crossing date, then registration ID.
pub async fn notices_in_range(
    store: &dyn RegistrationStore,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RegistrationNotices>, AppError> {
    if from > to {
        return Err(AppError::BadRequest(
            "'from' must not be after 'to'".to_string(),
        ));
    }
    if (to - from).num_days() > MAX_REPORT_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "Date range must not exceed {} days",
            MAX_REPORT_RANGE_DAYS
        )));
    }

    let registrations = store.list_registrations().await?;
    let mut rows = Vec::new();

    for registration in registrations {
        let Some(expiry) = registration.expiry_date else {
            continue;
        };

        let crossings: Vec<(Threshold, NaiveDate)> = Threshold::ALL
            .into_iter()
            .filter_map(|t| t.crossing_date(expiry).map(|d| (t, d)))
            .filter(|(_, d)| *d >= from && *d <= to)
            .collect();
        if crossings.is_empty() {
            continue;
        }

        let events = if registration.notified_thresholds.is_empty() {
            Vec::new()
        } else {
            store.get_notification_events(&registration.id).await?
        };

        let notices = crossings
            .into_iter()
            .map(|(threshold, crossing_date)| ThresholdNotice {
                threshold,
                crossing_date,
                notified: registration.notified_thresholds.contains(&threshold),
                notified_at: events
                    .iter()
                    .filter(|e| e.threshold == threshold)
                    .map(|e| e.sent_at)
                    .min(),
            })
            .collect();

        rows.push(RegistrationNotices {
            registration_id: registration.id.clone(),
            trademark_name: registration.trademark_name.clone(),
            territory: registration.territory.clone(),
            number: registration.display_number().to_string(),
            expiry_date: expiry,
            renewal_status: registration.renewal_status,
            notices,
        });
    }

    rows.sort_by(|a, b| {
        let first = |r: &RegistrationNotices| r.notices.first().map(|n| n.crossing_date);
        first(a)
            .cmp(&first(b))
            .then_with(|| a.registration_id.cmp(&b.registration_id))
    });

    Ok(rows)
}

/// Active registrations expiring between `today` and `today + days`,
/// soonest first.
pub async fn expiring_within(
    store: &dyn RegistrationStore,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<Registration>, AppError> {
    let mut expiring: Vec<Registration> = store
        .list_active_registrations()
        .await?
        .into_iter()
        .filter(|r| {
            r.days_until_expiry(today)
                .is_some_and(|remaining| (0..=days).contains(&remaining))
        })
        .collect();

    expiring.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.id.cmp(&b.id)));
    Ok(expiring)
}
