// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trademark registration model and its renewal state machine.

use crate::error::AppError;
use crate::models::renewal_action::RenewalAction;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Renewal status of a registration.
///
/// `Active` is the only state that receives deadline notices. The other two
/// are terminal and set only by operator actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    #[default]
    Active,
    RenewalFiled,
    NotRenewing,
}

impl RenewalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalStatus::Active => "active",
            RenewalStatus::RenewalFiled => "renewal_filed",
            RenewalStatus::NotRenewing => "not_renewing",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RenewalStatus::Active)
    }
}

impl fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lead time before expiry at which a renewal notice is due.
///
/// Variants are declared in crossing order, so sorting yields the
/// largest lead time first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Threshold {
    #[serde(rename = "expiration_180")]
    SixMonths,
    #[serde(rename = "expiration_90")]
    ThreeMonths,
    #[serde(rename = "expiration_30")]
    OneMonth,
}

impl Threshold {
    pub const ALL: [Threshold; 3] = [
        Threshold::SixMonths,
        Threshold::ThreeMonths,
        Threshold::OneMonth,
    ];

    /// Lead time in calendar months.
    pub fn months(self) -> u32 {
        match self {
            Threshold::SixMonths => 6,
            Threshold::ThreeMonths => 3,
            Threshold::OneMonth => 1,
        }
    }

    /// Stable storage/wire key.
    pub fn key(self) -> &'static str {
        match self {
            Threshold::SixMonths => "expiration_180",
            Threshold::ThreeMonths => "expiration_90",
            Threshold::OneMonth => "expiration_30",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Threshold::SixMonths => "6 months",
            Threshold::ThreeMonths => "3 months",
            Threshold::OneMonth => "1 month",
        }
    }

    /// First day on which this threshold counts as crossed for `expiry`.
    ///
    /// Uses calendar-month subtraction; the day is clamped to the end of
    /// the target month (e.g. Aug 31 minus 6 months is Feb 28/29).
    pub fn crossing_date(self, expiry: NaiveDate) -> Option<NaiveDate> {
        expiry.checked_sub_months(Months::new(self.months()))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Registration record stored in Firestore (document ID = `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Registration {
    pub id: String,
    pub trademark_name: String,
    /// Territory display name (e.g. "Russian Federation", "WIPO (Madrid)")
    pub territory: String,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub application_number: Option<String>,
    /// Registration expiry; `None` if never entered or imported
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub renewal_status: RenewalStatus,
    /// Thresholds that already produced a successful notice
    #[serde(default)]
    pub notified_thresholds: BTreeSet<Threshold>,
    #[serde(default)]
    pub renewal_filed_date: Option<NaiveDate>,
    #[serde(default)]
    pub renewal_decision_date: Option<NaiveDate>,
    #[serde(default)]
    pub renewal_notes: Option<String>,
    /// Last update timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl Registration {
    /// Registration number, falling back to the application number.
    pub fn display_number(&self) -> &str {
        self.registration_number
            .as_deref()
            .or(self.application_number.as_deref())
            .unwrap_or("-")
    }

    /// Days from `today` until expiry (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - today).num_days())
    }

    /// Mark a threshold as notified.
    ///
    /// Returns `false` if it was already recorded.
    pub fn record_threshold(&mut self, threshold: Threshold, now: &str) -> bool {
        if !self.notified_thresholds.insert(threshold) {
            return false;
        }
        self.updated_at = now.to_string();
        true
    }

    /// Apply an operator renewal action.
    ///
    /// Returns `Ok(true)` if the status changed and `Ok(false)` if the
    /// registration is already in the requested state. Moving between the
    /// two terminal states is rejected.
    pub fn apply_action(&mut self, action: &RenewalAction, now: &str) -> Result<bool, AppError> {
        let requested = action.action_type.target_status();

        if self.renewal_status == requested {
            return Ok(false);
        }

        if self.renewal_status.is_terminal() {
            return Err(AppError::InvalidStateTransition {
                registration_id: self.id.clone(),
                current: self.renewal_status,
                requested,
            });
        }

        match requested {
            RenewalStatus::RenewalFiled => self.renewal_filed_date = Some(action.action_date),
            RenewalStatus::NotRenewing => self.renewal_decision_date = Some(action.action_date),
            RenewalStatus::Active => {}
        }
        if action.notes.is_some() {
            self.renewal_notes = action.notes.clone();
        }
        self.renewal_status = requested;
        self.updated_at = now.to_string();

        Ok(true)
    }
}
