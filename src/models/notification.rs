// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification channel and dispatched-notice records.

use crate::models::registration::Threshold;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Delivery mechanism for deadline notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    MessagingBot,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::MessagingBot => "messaging_bot",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One successfully delivered deadline notice.
///
/// Written atomically with the registration's notified-thresholds update,
/// one per channel that accepted the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationEvent {
    pub registration_id: String,
    pub threshold: Threshold,
    pub channel: Channel,
    pub sent_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Document ID: unique per (registration, threshold, channel).
    pub fn doc_id(&self) -> String {
        format!(
            "{}_{}_{}",
            urlencoding::encode(&self.registration_id),
            self.threshold.key(),
            self.channel.as_str()
        )
    }
}
