// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trademark Renewals API Server
//!
//! Runs the renewal-deadline check for a trademark portfolio when called by
//! an external scheduler, and serves the operator API.

use std::sync::Arc;
use trademark_renewals::{
    channels_from_config,
    config::{Config, StoreBackend},
    db::{seed_from_file, FirestoreDb, InMemoryStore, RegistrationStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Trademark Renewals API");

    let store: Arc<dyn RegistrationStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory registration store; data is not persisted");
            Arc::new(InMemoryStore::new())
        }
    };

    if let Some(path) = &config.seed_registrations_path {
        seed_from_file(store.as_ref(), path).await?;
    } else if config.store_backend == StoreBackend::Memory {
        tracing::warn!("In-memory store has no seed file; starting with no registrations");
    }

    let channels = channels_from_config(&config);
    tracing::info!(
        channels = ?channels.iter().map(|c| c.kind()).collect::<Vec<_>>(),
        "Notification channels configured"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, channels));

    // Build router
    let app = trademark_renewals::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trademark_renewals=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
