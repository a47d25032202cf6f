//! Audit log of operator renewal decisions.

use crate::models::registration::RenewalStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Operator action that ends the notice lifecycle for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RenewalActionType {
    RenewalFiled,
    NotRenewing,
}

impl RenewalActionType {
    pub fn target_status(self) -> RenewalStatus {
        match self {
            RenewalActionType::RenewalFiled => RenewalStatus::RenewalFiled,
            RenewalActionType::NotRenewing => RenewalStatus::NotRenewing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenewalActionType::RenewalFiled => "renewal_filed",
            RenewalActionType::NotRenewing => "not_renewing",
        }
    }
}

/// Stored renewal action (one per applied status transition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RenewalAction {
    pub registration_id: String,
    pub action_type: RenewalActionType,
    /// Date the decision or filing took effect
    pub action_date: NaiveDate,
    pub previous_status: RenewalStatus,
    pub new_status: RenewalStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Subject of the operator token that performed the action
    pub actor: String,
    /// When the action was recorded (ISO 8601)
    pub created_at: String,
}

impl RenewalAction {
    /// Document ID: one action per registration and transition.
    pub fn doc_id(&self) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(&self.registration_id),
            self.action_type.as_str()
        )
    }
}
