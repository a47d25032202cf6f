// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deadline evaluation.
//!
//! Pure functions of `(today, registration)`: no clock reads, no I/O. The
//! scheduler supplies the date so passes are reproducible.

use crate::models::{Registration, RenewalStatus, Threshold};
use chrono::NaiveDate;
use serde::Serialize;

/// Why an active registration cannot be scheduled for notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OverdueReason {
    /// No expiry date on record.
    MissingExpiry,
    /// Expiry is strictly before `today`.
    Expired { days_past: i64 },
}

/// Outcome of evaluating one registration on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Crossed and unnotified thresholds, largest lead time first.
    /// Empty when nothing is due.
    Due(Vec<Threshold>),
    /// Active, but the expiry is missing or already past.
    Overdue(OverdueReason),
    /// Renewal filed or declined; no further notices.
    Suspended(RenewalStatus),
}

impl Evaluation {
    /// Due thresholds, or an empty slice for any non-due outcome.
    pub fn due(&self) -> &[Threshold] {
        match self {
            Evaluation::Due(thresholds) => thresholds,
            _ => &[],
        }
    }
}

/// Evaluate which renewal notices are due for `registration` on `today`.
///
/// A threshold is due when the registration is active, `today` is on or
/// after `expiry - lead time` (calendar months) and the threshold has not
/// already been notified. Expiry on `today` itself still counts as upcoming.
pub fn evaluate(today: NaiveDate, registration: &Registration) -> Evaluation {
    if registration.renewal_status.is_terminal() {
        return Evaluation::Suspended(registration.renewal_status);
    }

    let Some(expiry) = registration.expiry_date else {
        return Evaluation::Overdue(OverdueReason::MissingExpiry);
    };

    if expiry < today {
        return Evaluation::Overdue(OverdueReason::Expired {
            days_past: (today - expiry).num_days(),
        });
    }

    let due = Threshold::ALL
        .into_iter()
        .filter(|t| !registration.notified_thresholds.contains(t))
        .filter(|t| t.crossing_date(expiry).is_some_and(|crossed| today >= crossed))
        .collect();

    Evaluation::Due(due)
}

/// Portfolio counts for the daily summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryCounts {
    /// Active, expiring within 30 days (inclusive of today)
    pub within_30: usize,
    pub within_90: usize,
    pub within_180: usize,
    /// Active with expiry before today
    pub expired: usize,
    /// Active with no expiry date
    pub missing_expiry: usize,
}

/// Count active registrations by how soon they expire.
///
/// Windows are cumulative: a registration expiring in 20 days is counted in
/// all three.
pub fn count_expiring<'a>(
    today: NaiveDate,
    registrations: impl IntoIterator<Item = &'a Registration>,
) -> ExpiryCounts {
    let mut counts = ExpiryCounts::default();

    for registration in registrations {
        if registration.renewal_status.is_terminal() {
            continue;
        }
        match registration.days_until_expiry(today) {
            None => counts.missing_expiry += 1,
            Some(days) if days < 0 => counts.expired += 1,
            Some(days) => {
                if days <= 180 {
                    counts.within_180 += 1;
                }
                if days <= 90 {
                    counts.within_90 += 1;
                }
                if days <= 30 {
                    counts.within_30 += 1;
                }
            }
        }
    }

    counts
}
