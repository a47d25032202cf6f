//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT key, scheduler token, channel credentials) are injected as
//! environment variables by the deployment and read once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Header carrying the shared scheduler secret on `/tasks/*` routes.
pub const SCHEDULER_TOKEN_HEADER: &str = "x-scheduler-token";

const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Which registration store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for local development only. Starts empty
    /// unless `SEED_REGISTRATIONS_PATH` is set.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// JSON array of registrations upserted at startup
    pub seed_registrations_path: Option<PathBuf>,

    // --- Notification channels ---
    /// Email recipients for deadline notices
    pub notify_emails: Vec<String>,
    /// Transactional mail API endpoint (email channel disabled if unset)
    pub email_api_url: Option<String>,
    pub email_from: String,
    /// Messaging bot API base URL
    pub telegram_api_url: String,
    /// Chat IDs that receive bot messages
    pub telegram_chat_ids: Vec<String>,
    /// Upper bound on a single channel delivery
    pub channel_timeout: Duration,

    // --- Secrets ---
    /// Mail API server token
    pub email_api_token: Option<String>,
    /// Bot token (bot channel disabled if unset)
    pub telegram_bot_token: Option<String>,
    /// JWT signing key for operator tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret presented by the scheduler on `/tasks/*`
    pub scheduler_token: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            seed_registrations_path: None,
            notify_emails: vec!["trademarks@example.com".to_string()],
            email_api_url: None,
            email_from: "Trademark System <noreply@example.com>".to_string(),
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            telegram_chat_ids: Vec::new(),
            channel_timeout: Duration::from_secs(2),
            email_api_token: None,
            telegram_bot_token: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            scheduler_token: "test_scheduler_token".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .trim()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let channel_timeout_secs = match env::var("CHANNEL_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("CHANNEL_TIMEOUT_SECS"))?,
            Err(_) => DEFAULT_CHANNEL_TIMEOUT_SECS,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            seed_registrations_path: optional_var("SEED_REGISTRATIONS_PATH").map(PathBuf::from),

            notify_emails: parse_list(&env::var("NOTIFY_EMAILS").unwrap_or_default()),
            email_api_url: optional_var("EMAIL_API_URL"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Trademark System <noreply@example.com>".to_string()),
            telegram_api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.to_string()),
            telegram_chat_ids: parse_list(&env::var("TELEGRAM_CHAT_IDS").unwrap_or_default()),
            channel_timeout: Duration::from_secs(channel_timeout_secs),

            email_api_token: optional_var("EMAIL_API_TOKEN"),
            telegram_bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            scheduler_token: env::var("SCHEDULER_TOKEN")
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("SCHEDULER_TOKEN"))?,
        })
    }
}

/// Read an optional variable, treating blank values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("SCHEDULER_TOKEN", " sched-secret ");
        env::set_var("NOTIFY_EMAILS", "a@example.com, ,b@example.com");
        env::set_var("TELEGRAM_CHAT_IDS", "-100123,42");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.scheduler_token, "sched-secret");
        assert_eq!(config.notify_emails, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.telegram_chat_ids, vec!["-100123", "42"]);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_list() {
        assert!(parse_list("").is_empty());
        assert_eq!(parse_list(" x ,y,,"), vec!["x", "y"]);
    }
}
