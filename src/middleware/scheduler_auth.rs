// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler authentication middleware for `/tasks/*` routes.

use crate::config::SCHEDULER_TOKEN_HEADER;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require the shared scheduler secret in `x-scheduler-token`.
pub async fn require_scheduler_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(SCHEDULER_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    let Some(presented) = presented else {
        tracing::warn!(
            path = %request.uri().path(),
            "Blocked tasks request without scheduler token"
        );
        return Err(StatusCode::FORBIDDEN);
    };

    if !token_matches(presented, &state.config.scheduler_token) {
        tracing::warn!(
            path = %request.uri().path(),
            "Blocked tasks request with invalid scheduler token"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison; an empty configured secret never matches.
fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
