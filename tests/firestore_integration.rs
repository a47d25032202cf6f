// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). They are skipped otherwise.

use chrono::NaiveDate;
use trademark_renewals::db::{FirestoreDb, RecordOutcome, RegistrationStore, TransitionOutcome};
use trademark_renewals::error::AppError;
use trademark_renewals::models::{
    Channel, NotificationEvent, RenewalAction, RenewalActionType, RenewalStatus, Threshold,
};

mod common;
use common::{test_db, test_registration};

/// Generate a unique registration ID for test isolation.
fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

fn action(id: &str, action_type: RenewalActionType) -> RenewalAction {
    RenewalAction {
        registration_id: id.to_string(),
        action_type,
        action_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        previous_status: RenewalStatus::Active,
        new_status: action_type.target_status(),
        notes: None,
        actor: "emulator@example.com".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn test_registration_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("roundtrip");
    let mut reg = test_registration(&id, NaiveDate::from_ymd_opt(2027, 4, 1));
    reg.notified_thresholds.insert(Threshold::SixMonths);

    db.upsert_registration(&reg).await.unwrap();
    let loaded = db.get_registration(&id).await.unwrap();

    assert_eq!(loaded, Some(reg));
}

#[tokio::test]
async fn test_record_notification_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("record");
    db.upsert_registration(&test_registration(&id, NaiveDate::from_ymd_opt(2027, 1, 1)))
        .await
        .unwrap();

    let events = [NotificationEvent {
        registration_id: id.clone(),
        threshold: Threshold::ThreeMonths,
        channel: Channel::Email,
        sent_at: chrono::Utc::now(),
    }];

    let first = db
        .record_notification(&id, Threshold::ThreeMonths, &events)
        .await
        .unwrap();
    let second = db
        .record_notification(&id, Threshold::ThreeMonths, &events)
        .await
        .unwrap();

    assert_eq!(first, RecordOutcome::Recorded);
    assert_eq!(second, RecordOutcome::AlreadyNotified);

    let reg = db.get_registration(&id).await.unwrap().unwrap();
    assert!(reg.notified_thresholds.contains(&Threshold::ThreeMonths));
    assert_eq!(db.get_notification_events(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_renewal_action_transitions() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("action");
    db.upsert_registration(&test_registration(&id, NaiveDate::from_ymd_opt(2027, 1, 1)))
        .await
        .unwrap();

    let applied = db
        .apply_renewal_action(&action(&id, RenewalActionType::RenewalFiled))
        .await
        .unwrap();
    assert!(matches!(applied, TransitionOutcome::Applied(_)));

    let repeat = db
        .apply_renewal_action(&action(&id, RenewalActionType::RenewalFiled))
        .await
        .unwrap();
    assert!(matches!(repeat, TransitionOutcome::Unchanged(_)));

    let err = db
        .apply_renewal_action(&action(&id, RenewalActionType::NotRenewing))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition { .. }));

    assert_eq!(db.get_renewal_actions(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_offline_mock_reports_database_error() {
    let db = FirestoreDb::new_mock();
    let err = db.list_active_registrations().await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
async fn test_notice_record_never_reverts_status_change() {
    require_emulator!();

    // Two clients stand in for two service instances that do not share
    // the in-process registration locks.
    let pass_instance = test_db().await;
    let operator_instance = test_db().await;

    let ids: Vec<String> = (0..8).map(|i| unique_id(&format!("race{}", i))).collect();
    for id in &ids {
        pass_instance
            .upsert_registration(&test_registration(id, NaiveDate::from_ymd_opt(2027, 1, 1)))
            .await
            .unwrap();
    }

    for id in &ids {
        let events = [NotificationEvent {
            registration_id: id.clone(),
            threshold: Threshold::ThreeMonths,
            channel: Channel::Email,
            sent_at: chrono::Utc::now(),
        }];
        let not_renewing = action(id, RenewalActionType::NotRenewing);

        let (_recorded, changed) = tokio::join!(
            pass_instance.record_notification(id, Threshold::ThreeMonths, &events),
            operator_instance.apply_renewal_action(&not_renewing),
        );

        // A losing transaction may abort; retry the operator side once so
        // the final state always carries the decision.
        if changed.is_err() {
            operator_instance
                .apply_renewal_action(&not_renewing)
                .await
                .unwrap();
        }

        let reg = pass_instance.get_registration(id).await.unwrap().unwrap();
        assert_eq!(reg.renewal_status, RenewalStatus::NotRenewing, "{}", id);
    }
}

#[tokio::test]
async fn test_notice_record_after_status_change_keeps_status() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("after");
    db.upsert_registration(&test_registration(&id, NaiveDate::from_ymd_opt(2027, 1, 1)))
        .await
        .unwrap();
    db.apply_renewal_action(&action(&id, RenewalActionType::RenewalFiled))
        .await
        .unwrap();

    let events = [NotificationEvent {
        registration_id: id.clone(),
        threshold: Threshold::OneMonth,
        channel: Channel::MessagingBot,
        sent_at: chrono::Utc::now(),
    }];
    db.record_notification(&id, Threshold::OneMonth, &events)
        .await
        .unwrap();

    let reg = db.get_registration(&id).await.unwrap().unwrap();
    assert_eq!(reg.renewal_status, RenewalStatus::RenewalFiled);
    assert!(reg.notified_thresholds.contains(&Threshold::OneMonth));
}
