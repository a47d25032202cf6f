// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification channel abstraction and message content.

use crate::models::{Channel, Registration, Threshold};
use crate::services::evaluator::ExpiryCounts;
use crate::time_utils::format_display_date;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;

/// Channel delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel does not deliver summaries")]
    Unsupported,
}

/// How close a notice is to the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// 30 days or fewer
    Urgent,
    /// 90 days or fewer
    Attention,
    Notice,
}

impl Urgency {
    pub fn from_days(days_remaining: i64) -> Self {
        match days_remaining {
            d if d <= 30 => Urgency::Urgent,
            d if d <= 90 => Urgency::Attention,
            _ => Urgency::Notice,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Urgency::Urgent => "URGENT",
            Urgency::Attention => "Attention",
            Urgency::Notice => "Notice",
        }
    }
}

/// One renewal-deadline notice, ready to render on any channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub registration_id: String,
    pub trademark_name: String,
    pub territory: String,
    pub number: String,
    pub expiry_date: NaiveDate,
    pub days_remaining: i64,
    pub threshold: Threshold,
}

impl Notice {
    /// Build a notice; `None` if the registration has no expiry date.
    pub fn new(registration: &Registration, threshold: Threshold, today: NaiveDate) -> Option<Self> {
        let expiry_date = registration.expiry_date?;
        Some(Self {
            registration_id: registration.id.clone(),
            trademark_name: registration.trademark_name.clone(),
            territory: registration.territory.clone(),
            number: registration.display_number().to_string(),
            expiry_date,
            days_remaining: (expiry_date - today).num_days(),
            threshold,
        })
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::from_days(self.days_remaining)
    }

    pub fn subject(&self) -> String {
        format!(
            "[{}] Trademark renewal due: {} ({}) expires {}",
            self.urgency().label(),
            self.trademark_name,
            self.territory,
            format_display_date(self.expiry_date)
        )
    }

    /// Plain-text body shared by all channels.
    pub fn text_body(&self) -> String {
        format!(
            "Trademark: {}\n\
             Territory: {}\n\
             Number: {}\n\
             Expiry date: {}\n\
             Days remaining: {}\n\
             Reminder: {} before expiry\n\n\
             Mark the registration as renewal-filed or not-renewing to stop further reminders.",
            self.trademark_name,
            self.territory,
            self.number,
            format_display_date(self.expiry_date),
            self.days_remaining,
            self.threshold.label()
        )
    }
}

/// Daily portfolio summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirySummary {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: ExpiryCounts,
}

impl ExpirySummary {
    pub fn text_body(&self) -> String {
        format!(
            "Trademark expiry summary for {}\n\
             Expiring within 30 days: {}\n\
             Expiring within 90 days: {}\n\
             Expiring within 180 days: {}\n\
             Expired, still active: {}\n\
             Missing expiry date: {}",
            format_display_date(self.date),
            self.counts.within_30,
            self.counts.within_90,
            self.counts.within_180,
            self.counts.expired,
            self.counts.missing_expiry
        )
    }
}

/// A delivery mechanism for notices.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> Channel;

    async fn send_notice(&self, notice: &Notice) -> Result<(), ChannelError>;

    /// Deliver the daily summary. Channels that do not carry summaries
    /// keep the default.
    async fn send_summary(&self, _summary: &ExpirySummary) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported)
    }
}

/// Map a non-success HTTP response to `ChannelError::Rejected`.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<(), ChannelError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Rejected { status, body })
}
