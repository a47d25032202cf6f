// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only API tests: expiring list, notice history, renewal-notice report.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

mod common;
use common::{create_test_app, create_test_jwt, json_body, task_request, test_registration};

fn get(uri: &str, app: &common::TestApp) -> Request<Body> {
    let token = create_test_jwt("viewer@example.com", "viewer", &app.state.config.jwt_signing_key);
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_expiring_default_and_custom_window() {
    let today = Utc::now().date_naive();
    let app = create_test_app(vec![
        test_registration("soon", Some(today + Duration::days(20))),
        test_registration("mid", Some(today + Duration::days(150))),
        test_registration("far", Some(today + Duration::days(300))),
    ]);

    let body = json_body(app.send(get("/api/registrations/expiring", &app)).await).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["soon", "mid"]);

    let body =
        json_body(app.send(get("/api/registrations/expiring?days=30", &app)).await).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["days_until_expiry"], 20);
}

#[tokio::test]
async fn test_expiring_days_out_of_range() {
    let app = create_test_app(vec![]);
    for uri in [
        "/api/registrations/expiring?days=0",
        "/api/registrations/expiring?days=366",
    ] {
        let response = app.send(get(uri, &app)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_notification_history_after_pass() {
    let day0 = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let app = create_test_app(vec![test_registration(
        "r1",
        Some(day0 + Duration::days(60)),
    )]);

    // Six- and three-month thresholds are both crossed on day0.
    let response = app
        .send(task_request(
            "/tasks/check-expiring",
            json!({ "as_of": day0 }),
            &app.state,
        ))
        .await;
    assert_eq!(json_body(response).await["notified"], 2);

    let events = json_body(app.send(get("/api/registrations/r1/notifications", &app)).await).await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .any(|e| e["threshold"] == "expiration_90" && e["channel"] == "messaging_bot"));

    let response = app
        .send(get("/api/registrations/nope/notifications", &app))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_renewal_notices_report() {
    let app = create_test_app(vec![
        // Crossings 2026-12-10, 2027-03-10, 2027-05-10
        test_registration("a", NaiveDate::from_ymd_opt(2027, 6, 10)),
        // Crossings 2027-08-01, 2027-11-01, 2027-12-01
        test_registration("b", NaiveDate::from_ymd_opt(2028, 2, 1)),
    ]);

    let response = app
        .send(get(
            "/api/reports/renewal-notices?from=2026-12-01&to=2027-03-31",
            &app,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["registration_id"], "a");
    assert_eq!(rows[0]["notices"][0]["threshold"], "expiration_180");
    assert_eq!(rows[0]["notices"][0]["crossing_date"], "2026-12-10");
    assert_eq!(rows[0]["notices"][1]["threshold"], "expiration_90");
    assert_eq!(rows[0]["notices"][1]["notified"], false);
}

#[tokio::test]
async fn test_renewal_notices_report_bad_params() {
    let app = create_test_app(vec![]);
    for uri in [
        "/api/reports/renewal-notices?from=2027-01-01",
        "/api/reports/renewal-notices?from=01.01.2027&to=2027-02-01",
        "/api/reports/renewal-notices?from=2027-03-01&to=2027-02-01",
    ] {
        let response = app.send(get(uri, &app)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_read_routes_require_auth() {
    let app = create_test_app(vec![test_registration("r1", None)]);
    let response = app
        .send(
            Request::builder()
                .uri("/api/registrations/r1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app(vec![]);
    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    for (name, value) in trademark_renewals::middleware::security::SECURITY_HEADERS {
        assert_eq!(response.headers().get(name).unwrap(), value, "header {}", name);
    }

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["channels"], json!(["email", "messaging_bot"]));
}
