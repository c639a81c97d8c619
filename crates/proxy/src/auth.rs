//! Bearer-token verification against the identity provider.
//!
//! Every authenticated route re-verifies the caller's Firebase ID token
//! server-side via the `accounts:lookup` REST endpoint. Verified tokens are
//! cached for a few minutes (`moka`) so a burst of cart traffic does not turn
//! into a burst of verification calls; the cache TTL is well inside the
//! one-hour token lifetime.

use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use mirabel_core::{Email, Identity};

const DEFAULT_LOOKUP_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const VERDICT_TTL: Duration = Duration::from_secs(300);
const VERDICT_CAPACITY: u64 = 10_000;

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is missing, malformed, or expired.
    #[error("invalid token")]
    InvalidToken,

    /// The verification request itself failed.
    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider rejected the request for another reason.
    #[error("verifier rejected the request: {0}")]
    Upstream(String),
}

/// Verifies Firebase ID tokens and resolves them to identities.
#[derive(Clone)]
pub struct FirebaseVerifier {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    verdicts: Cache<String, Identity>,
}

impl FirebaseVerifier {
    /// Create a verifier against the production endpoint.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self::with_endpoint(api_key, DEFAULT_LOOKUP_ENDPOINT)
    }

    /// Create a verifier against a custom endpoint (tests, emulator).
    #[must_use]
    pub fn with_endpoint(api_key: SecretString, endpoint: impl Into<String>) -> Self {
        let verdicts = Cache::builder()
            .max_capacity(VERDICT_CAPACITY)
            .time_to_live(VERDICT_TTL)
            .build();
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: endpoint.into(),
            verdicts,
        }
    }

    /// Verify `id_token` and return the identity it belongs to.
    ///
    /// # Errors
    ///
    /// [`VerifyError::InvalidToken`] for a rejected token, other variants for
    /// transport failures (which are not cached).
    #[instrument(skip_all)]
    pub async fn verify(&self, id_token: &str) -> Result<Identity, VerifyError> {
        if let Some(identity) = self.verdicts.get(id_token).await {
            return Ok(identity);
        }

        let url = format!(
            "{}/accounts:lookup?key={}",
            self.endpoint,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            // The provider answers 400 for expired/garbled tokens.
            return Err(VerifyError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerifyError::Upstream(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: LookupResponse = response.json().await?;
        let user = body
            .users
            .into_iter()
            .next()
            .ok_or(VerifyError::InvalidToken)?;

        let identity = Identity::new(
            user.local_id,
            user.email.as_deref().and_then(|e| Email::parse(e).ok()),
        );
        self.verdicts
            .insert(id_token.to_owned(), identity.clone())
            .await;
        Ok(identity)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_response_parses_provider_shape() {
        let json = r#"{
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{"localId": "u1", "email": "user@example.com", "emailVerified": true}]
        }"#;
        let body: LookupResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(body.users.len(), 1);
        assert_eq!(body.users[0].local_id, "u1");
        assert_eq!(body.users[0].email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn lookup_response_tolerates_missing_users() {
        let body: LookupResponse = serde_json::from_str("{}").expect("parse");
        assert!(body.users.is_empty());
    }
}
