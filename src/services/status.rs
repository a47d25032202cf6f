// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator renewal decisions (renewal filed / not renewing).

use crate::db::{RegistrationStore, TransitionOutcome};
use crate::error::AppError;
use crate::models::{Registration, RenewalAction, RenewalActionType};
use crate::services::dispatcher::{registration_lock, RegistrationLocks};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub const MAX_NOTES_CHARS: u64 = 2000;

/// Optional request body for a renewal action.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RenewalActionRequest {
    /// Effective date; defaults to the day the action is recorded
    pub action_date: Option<NaiveDate>,
    #[validate(length(max = MAX_NOTES_CHARS, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Result of a status change request.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub registration: Registration,
    /// `false` if the registration was already in the requested state
    pub changed: bool,
}

pub struct StatusMutator {
    store: Arc<dyn RegistrationStore>,
    locks: RegistrationLocks,
}

impl StatusMutator {
    pub fn new(store: Arc<dyn RegistrationStore>, locks: RegistrationLocks) -> Self {
        Self { store, locks }
    }

    /// Mark a registration as renewal filed. Idempotent.
    pub async fn mark_renewal_filed(
        &self,
        registration_id: &str,
        request: RenewalActionRequest,
        actor: &str,
        today: NaiveDate,
    ) -> Result<StatusChange, AppError> {
        self.apply(
            registration_id,
            RenewalActionType::RenewalFiled,
            request,
            actor,
            today,
        )
        .await
    }

    /// Mark a registration as not being renewed. Idempotent.
    pub async fn mark_not_renewing(
        &self,
        registration_id: &str,
        request: RenewalActionRequest,
        actor: &str,
        today: NaiveDate,
    ) -> Result<StatusChange, AppError> {
        self.apply(
            registration_id,
            RenewalActionType::NotRenewing,
            request,
            actor,
            today,
        )
        .await
    }

    async fn apply(
        &self,
        registration_id: &str,
        action_type: RenewalActionType,
        request: RenewalActionRequest,
        actor: &str,
        today: NaiveDate,
    ) -> Result<StatusChange, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let notes = request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let action = RenewalAction {
            registration_id: registration_id.to_string(),
            action_type,
            action_date: request.action_date.unwrap_or(today),
            // Filled in by the store from the registration it reads.
            previous_status: Default::default(),
            new_status: action_type.target_status(),
            notes,
            actor: actor.to_string(),
            created_at: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        };

        let lock = registration_lock(&self.locks, registration_id);
        let _guard = lock.lock().await;

        let outcome = self.store.apply_renewal_action(&action).await?;
        let changed = matches!(outcome, TransitionOutcome::Applied(_));

        if changed {
            tracing::info!(
                registration_id,
                action = action_type.as_str(),
                actor,
                "Renewal status changed"
            );
        } else {
            tracing::debug!(
                registration_id,
                action = action_type.as_str(),
                "Renewal status already set (idempotent no-op)"
            );
        }

        Ok(StatusChange {
            registration: outcome.into_registration(),
            changed,
        })
    }
}
