//! Proxy configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service-role key (server-side only,
//!   validated against placeholder patterns and low entropy)
//! - `FIREBASE_API_KEY` - Firebase web API key (token verification)
//!
//! ## Optional
//! - `PROXY_HOST` - Bind address (default: 127.0.0.1)
//! - `PROXY_PORT` - Listen port (default: 3001)
//! - `ADMIN_EMAILS` - Comma-separated admin allow-list for privileged routes
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use mirabel_core::Email;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Proxy application configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Supabase project URL (e.g. `https://abc.supabase.co`)
    pub supabase_url: String,
    /// Supabase service-role key (bypasses row-level security)
    pub supabase_service_role_key: SecretString,
    /// Firebase web API key, used for `accounts:lookup` verification
    pub firebase_api_key: SecretString,
    /// Admin allow-list for privileged (events/products) routes
    pub admin_emails: Vec<Email>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the service-role key fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("PROXY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PROXY_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("PROXY_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PROXY_PORT".to_owned(), e.to_string()))?;

        let supabase_url = get_required_env("SUPABASE_URL")?;
        url::Url::parse(&supabase_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_owned(), e.to_string()))?;

        let supabase_service_role_key = get_validated_secret("SUPABASE_SERVICE_ROLE_KEY")?;
        let firebase_api_key = get_required_env("FIREBASE_API_KEY").map(SecretString::from)?;

        let admin_emails = match get_optional_env("ADMIN_EMAILS") {
            Some(raw) => parse_admin_emails(&raw)
                .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAILS".to_owned(), e))?,
            None => Vec::new(),
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            supabase_url,
            supabase_service_role_key,
            firebase_api_key,
            admin_emails,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether `email` is on the admin allow-list.
    #[must_use]
    pub fn is_admin(&self, email: &Email) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_case(email.as_str()))
    }
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

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_owned(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real service-role keys are JWTs with high entropy.
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn shannon_entropy_extremes() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn validate_secret_strength_rejects_placeholders() {
        assert!(validate_secret_strength("your-service-role-key", "TEST").is_err());
        assert!(validate_secret_strength("changeme123", "TEST").is_err());
    }

    #[test]
    fn validate_secret_strength_rejects_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn validate_secret_strength_accepts_random_keys() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST").is_ok());
    }

    #[test]
    fn parse_admin_emails_splits_and_validates() {
        let admins = parse_admin_emails("owner@mirabelwine.shop, cellar@mirabelwine.shop").unwrap();
        assert_eq!(admins.len(), 2);
        assert!(parse_admin_emails("nope").is_err());
    }

    #[test]
    fn is_admin_is_case_insensitive() {
        let config = ProxyConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            supabase_url: "https://abc.supabase.co".to_owned(),
            supabase_service_role_key: SecretString::from("k"),
            firebase_api_key: SecretString::from("k"),
            admin_emails: vec![Email::parse("owner@mirabelwine.shop").unwrap()],
            sentry_dsn: None,
        };
        assert!(config.is_admin(&Email::parse("Owner@MirabelWine.shop").unwrap()));
        assert!(!config.is_admin(&Email::parse("guest@mirabelwine.shop").unwrap()));
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = ProxyConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 3001,
            supabase_url: "https://abc.supabase.co".to_owned(),
            supabase_service_role_key: SecretString::from("k"),
            firebase_api_key: SecretString::from("k"),
            admin_emails: vec![],
            sentry_dsn: None,
        };
        let addr = config.socket_addr();
        assert_eq!(addr.port(), 3001);
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
    }
}
