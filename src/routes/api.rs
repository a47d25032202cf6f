// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated operators.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NotificationEvent, Registration, RenewalAction};
use crate::services::reports::{self, RegistrationNotices};
use crate::services::status::{RenewalActionRequest, StatusChange};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_EXPIRING_DAYS: i64 = 180;
const MAX_EXPIRING_DAYS: i64 = 365;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/registrations/expiring", get(get_expiring))
        .route("/api/registrations/{id}", get(get_registration))
        .route(
            "/api/registrations/{id}/notifications",
            get(get_notifications),
        )
        .route("/api/registrations/{id}/actions", get(get_actions))
        .route(
            "/api/registrations/{id}/renewal-filed",
            post(mark_renewal_filed),
        )
        .route(
            "/api/registrations/{id}/not-renewing",
            post(mark_not_renewing),
        )
        .route("/api/reports/renewal-notices", get(get_renewal_notices))
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

// ─── Registrations ───────────────────────────────────────────

/// Registration with derived deadline fields.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub registration: Registration,
    pub days_until_expiry: Option<i64>,
}

impl RegistrationResponse {
    fn new(registration: Registration, today: NaiveDate) -> Self {
        let days_until_expiry = registration.days_until_expiry(today);
        Self {
            registration,
            days_until_expiry,
        }
    }
}

async fn load_registration(state: &AppState, id: &str) -> Result<Registration> {
    state
        .store
        .get_registration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))
}

async fn get_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>> {
    let registration = load_registration(&state, &id).await?;
    Ok(Json(RegistrationResponse::new(registration, today())))
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<NotificationEvent>>> {
    load_registration(&state, &id).await?;
    Ok(Json(state.store.get_notification_events(&id).await?))
}

async fn get_actions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RenewalAction>>> {
    load_registration(&state, &id).await?;
    Ok(Json(state.store.get_renewal_actions(&id).await?))
}

#[derive(Deserialize)]
struct ExpiringQuery {
    days: Option<i64>,
}

/// Active registrations expiring within `days` (default 180).
async fn get_expiring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<RegistrationResponse>>> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRING_DAYS);
    if !(1..=MAX_EXPIRING_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "'days' must be between 1 and {}",
            MAX_EXPIRING_DAYS
        )));
    }

    let today = today();
    let registrations = reports::expiring_within(state.store.as_ref(), today, days).await?;

    Ok(Json(
        registrations
            .into_iter()
            .map(|r| RegistrationResponse::new(r, today))
            .collect(),
    ))
}

// ─── Renewal Status ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusChangeResponse {
    pub registration: Registration,
    /// `false` when the registration was already in the requested state
    pub changed: bool,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            registration: change.registration,
            changed: change.changed,
        }
    }
}

/// Parse an optional JSON body; empty means all defaults.
fn parse_action_body(body: &Bytes) -> Result<RenewalActionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RenewalActionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

async fn mark_renewal_filed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusChangeResponse>> {
    user.require_admin()?;
    let request = parse_action_body(&body)?;

    let change = state
        .status_mutator
        .mark_renewal_filed(&id, request, &user.subject, today())
        .await?;

    Ok(Json(change.into()))
}

async fn mark_not_renewing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusChangeResponse>> {
    user.require_admin()?;
    let request = parse_action_body(&body)?;

    let change = state
        .status_mutator
        .mark_not_renewing(&id, request, &user.subject, today())
        .await?;

    Ok(Json(change.into()))
}

// ─── Reports ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ReportQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_date(name: &str, raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw.ok_or_else(|| AppError::BadRequest(format!("Missing '{}' parameter", name)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid '{}' parameter: must be YYYY-MM-DD",
            name
        ))
    })
}

/// Threshold crossings in `[from, to]` with their notification state.
async fn get_renewal_notices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<RegistrationNotices>>> {
    let from = parse_date("from", query.from.as_deref())?;
    let to = parse_date("to", query.to.as_deref())?;

    Ok(Json(
        reports::notices_in_range(state.store.as_ref(), from, to).await?,
    ))
}
