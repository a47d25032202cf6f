// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use trademark_renewals::config::{Config, SCHEDULER_TOKEN_HEADER};
use trademark_renewals::db::{FirestoreDb, InMemoryStore};
use trademark_renewals::models::{Channel, Registration, RenewalStatus};
use trademark_renewals::routes::create_router;
use trademark_renewals::services::{ChannelError, ExpirySummary, Notice, NotificationChannel};
use trademark_renewals::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Channel double with switchable failure and a delivery counter.
pub struct ScriptedChannel {
    kind: Channel,
    failing: AtomicBool,
    pub notices: AtomicUsize,
    pub summaries: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedChannel {
    pub fn new(kind: Channel) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failing: AtomicBool::new(false),
            notices: AtomicUsize::new(0),
            summaries: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn notice_count(&self) -> usize {
        self.notices.load(Ordering::SeqCst)
    }

    fn outcome(&self) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ChannelError::Rejected {
                status: 503,
                body: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    fn kind(&self) -> Channel {
        self.kind
    }

    async fn send_notice(&self, _notice: &Notice) -> Result<(), ChannelError> {
        self.outcome()?;
        self.notices.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_summary(&self, _summary: &ExpirySummary) -> Result<(), ChannelError> {
        if self.kind != Channel::MessagingBot {
            return Err(ChannelError::Unsupported);
        }
        self.outcome()?;
        self.summaries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test app backed by the in-memory store and scripted channels.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryStore>,
    pub email: Arc<ScriptedChannel>,
    pub bot: Arc<ScriptedChannel>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Create a test app seeded with `registrations`.
#[allow(dead_code)]
pub fn create_test_app(registrations: Vec<Registration>) -> TestApp {
    let config = Config::default();
    let store = Arc::new(InMemoryStore::with_registrations(registrations));
    let email = ScriptedChannel::new(Channel::Email);
    let bot = ScriptedChannel::new(Channel::MessagingBot);

    let channels: Vec<Arc<dyn NotificationChannel>> =
        vec![email.clone() as Arc<dyn NotificationChannel>, bot.clone()];
    let state = Arc::new(AppState::new(config, store.clone(), channels));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        email,
        bot,
    }
}

/// Build an active registration expiring on `expiry`.
#[allow(dead_code)]
pub fn test_registration(id: &str, expiry: Option<NaiveDate>) -> Registration {
    Registration {
        id: id.to_string(),
        trademark_name: format!("MARK {}", id),
        territory: "Russian Federation".to_string(),
        registration_number: Some(format!("RU-{}", id)),
        application_number: None,
        expiry_date: expiry,
        renewal_status: RenewalStatus::Active,
        notified_thresholds: BTreeSet::new(),
        renewal_filed_date: None,
        renewal_decision_date: None,
        renewal_notes: None,
        updated_at: String::new(),
    }
}

/// Operator token claims (mirrors the middleware's expectations).
#[derive(serde::Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    role: &'a str,
    exp: usize,
    iat: usize,
}

/// Create an HS256 operator token.
#[allow(dead_code)]
pub fn create_test_jwt(subject: &str, role: &str, signing_key: &[u8]) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = TestClaims {
        sub: subject,
        role,
        exp: now + 3600,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .expect("Failed to create JWT")
}

/// Admin bearer header value for the test config.
#[allow(dead_code)]
pub fn admin_bearer(state: &AppState) -> String {
    format!(
        "Bearer {}",
        create_test_jwt("admin@example.com", "admin", &state.config.jwt_signing_key)
    )
}

/// Scheduler-authenticated POST to a task route.
#[allow(dead_code)]
pub fn task_request(uri: &str, body: serde_json::Value, state: &AppState) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(SCHEDULER_TOKEN_HEADER, state.config.scheduler_token.as_str())
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
