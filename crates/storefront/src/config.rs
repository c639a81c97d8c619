//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_API_KEY` - Firebase Auth web API key
//!
//! ## Optional
//! - `MIRABEL_API_BASE_URL` - CRUD proxy base URL (default: <http://127.0.0.1:3001>)
//! - `MIRABEL_STORAGE_DIR` - Durable local storage directory (default:
//!   `<platform data dir>/mirabel`, falling back to `.mirabel`)
//! - `ADMIN_EMAILS` - Comma-separated admin allow-list

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use mirabel_core::Email;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// CRUD proxy base URL.
    pub api_base_url: String,
    /// Firebase Auth web API key.
    pub firebase_api_key: SecretString,
    /// Directory for durable local storage (carts).
    pub storage_dir: PathBuf,
    /// Admin allow-list (external policy input).
    pub admin_emails: Vec<Email>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url =
            get_env_or_default("MIRABEL_API_BASE_URL", "http://127.0.0.1:3001");
        url::Url::parse(&api_base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MIRABEL_API_BASE_URL".to_owned(), e.to_string())
        })?;

        let firebase_api_key = get_required_env("FIREBASE_API_KEY").map(SecretString::from)?;

        let storage_dir = get_optional_env("MIRABEL_STORAGE_DIR")
            .map_or_else(default_storage_dir, PathBuf::from);

        let admin_emails = match get_optional_env("ADMIN_EMAILS") {
            Some(raw) => parse_admin_emails(&raw)
                .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAILS".to_owned(), e))?,
            None => Vec::new(),
        };

        Ok(Self {
            api_base_url,
            firebase_api_key,
            storage_dir,
            admin_emails,
        })
    }
}

/// The platform data directory for this app, or a dot-directory fallback.
fn default_storage_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".mirabel"), |dir| dir.join("mirabel"))
}

/// Parse a comma-separated admin allow-list, skipping empty segments.
fn parse_admin_emails(raw: &str) -> Result<Vec<Email>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Email::parse(s).map_err(|e| format!("{s}: {e}")))
        .collect()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
