// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for the external scheduler.
//!
//! These endpoints are called by the scheduler, not directly by users.
//! They are protected by the shared scheduler token (see routes/mod.rs).

use crate::error::{AppError, Result};
use crate::services::renewal_check::{PassReport, SummaryReport};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Json, State},
    routing::post,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// Task handler routes (called by the scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/check-expiring", post(check_expiring))
        .route("/tasks/daily-summary", post(daily_summary))
}

/// Optional task payload.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPayload {
    /// Evaluate as of this date instead of the current UTC date
    pub as_of: Option<NaiveDate>,
}

impl TaskPayload {
    fn parse(body: &Bytes) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid task payload: {}", e)))
    }

    fn date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

/// Run one renewal check pass.
async fn check_expiring(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PassReport>> {
    let payload = TaskPayload::parse(&body)?;
    let today = payload.date();

    tracing::info!(date = %today, "Renewal check triggered by scheduler");

    let report = state.renewal_check.run_pass(today).await?;
    Ok(Json(report))
}

/// Send the daily expiry summary.
async fn daily_summary(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SummaryReport>> {
    let payload = TaskPayload::parse(&body)?;
    let today = payload.date();

    tracing::info!(date = %today, "Daily summary triggered by scheduler");

    let report = state.renewal_check.send_daily_summary(today).await?;
    Ok(Json(report))
}
