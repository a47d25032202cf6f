//! Bulk registration import from a JSON file.
//!
//! The file holds an array of registration documents in the stored shape.
//! Used to fill the in-memory backend at startup and to load a portfolio
//! export into Firestore.

use crate::db::RegistrationStore;
use crate::error::AppError;
use crate::models::Registration;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(String),

    #[error("failed to parse seed file: {0}")]
    Parse(String),

    #[error("store rejected registration {id}: {source}")]
    Store {
        id: String,
        #[source]
        source: AppError,
    },
}

/// Parse a JSON array of registrations. Ids must be present and unique.
pub fn parse_registrations(json_data: &str) -> Result<Vec<Registration>, SeedError> {
    let registrations: Vec<Registration> =
        serde_json::from_str(json_data).map_err(|e| SeedError::Parse(e.to_string()))?;

    let mut seen = HashSet::new();
    for registration in &registrations {
        if registration.id.trim().is_empty() {
            return Err(SeedError::Parse("registration with empty id".to_string()));
        }
        if !seen.insert(registration.id.as_str()) {
            return Err(SeedError::Parse(format!(
                "duplicate registration id {}",
                registration.id
            )));
        }
    }

    Ok(registrations)
}

/// Upsert every registration in the file. Returns the number written.
pub async fn seed_from_file<P: AsRef<Path>>(
    store: &dyn RegistrationStore,
    path: P,
) -> Result<usize, SeedError> {
    let json_data = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|e| SeedError::Io(e.to_string()))?;
    let registrations = parse_registrations(&json_data)?;

    for registration in &registrations {
        store
            .upsert_registration(registration)
            .await
            .map_err(|source| SeedError::Store {
                id: registration.id.clone(),
                source,
            })?;
    }

    tracing::info!(
        path = %path.as_ref().display(),
        count = registrations.len(),
        "Registrations seeded"
    );
    Ok(registrations.len())
}
