//! Identity provider seam and the Firebase Auth implementation.
//!
//! The session observer and cart synchronizer only ever see the
//! [`IdentityProvider`] and [`TokenSource`] traits, so tests (and any future
//! provider swap) inject their own implementation. [`FirebaseAuth`] is the
//! production implementation over the Firebase Auth REST API.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::instrument;

use mirabel_core::{Email, Identity};

/// Leeway subtracted from token expiry so a token is refreshed before it
/// actually lapses mid-request.
const TOKEN_EXPIRY_LEEWAY: Duration = Duration::from_secs(60);

const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";

/// Errors from the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The email/password pair was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An operation that needs a signed-in identity was called without one.
    #[error("not signed in")]
    NotSignedIn,

    /// The HTTP request to the provider failed.
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request for another reason.
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
}

/// An external identity provider: sign-in/sign-out plus an auth-state
/// subscription delivering the current identity (or absence) in order.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Subscribe to auth-state changes. The current state is delivered
    /// immediately, then every transition in provider order.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>>;

    /// Sign in with email and password. On success the new identity is also
    /// announced through every subscription.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    /// Request sign-out. The transition to "no identity" is observed
    /// asynchronously through the subscription, not returned here.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// A source of short-lived bearer credentials for the current identity.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// A currently-valid bearer token, refreshed if necessary.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotSignedIn`] when no identity is signed in.
    async fn bearer_token(&self) -> Result<SecretString, ProviderError>;
}

/// The signed-in session held by [`FirebaseAuth`].
struct FirebaseSession {
    identity: Identity,
    id_token: SecretString,
    refresh_token: SecretString,
    expires_at: Instant,
}

/// Firebase Auth over its REST endpoints.
///
/// Holds at most one signed-in session and broadcasts auth-state changes to
/// subscribers, mirroring the provider's "auth state changed" callback.
pub struct FirebaseAuth {
    client: reqwest::Client,
    api_key: SecretString,
    auth_endpoint: String,
    token_endpoint: String,
    session: Mutex<Option<FirebaseSession>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
}

impl FirebaseAuth {
    /// Create a client against the production Firebase endpoints.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self::with_endpoints(api_key, DEFAULT_AUTH_ENDPOINT, DEFAULT_TOKEN_ENDPOINT)
    }

    /// Create a client against custom endpoints (tests, emulator).
    #[must_use]
    pub fn with_endpoints(
        api_key: SecretString,
        auth_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            auth_endpoint: auth_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            session: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// The currently signed-in identity, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.lock_session()
            .as_ref()
            .map(|s| s.identity.clone())
    }

    fn broadcast(&self, identity: Option<&Identity>) {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|tx| tx.send(identity.cloned()).is_ok());
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<FirebaseSession>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn refresh(&self, refresh_token: SecretString) -> Result<SecretString, ProviderError> {
        let url = format!(
            "{}/token?key={}",
            self.token_endpoint,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = read_provider_error(response).await;
            tracing::warn!(%status, message, "token refresh failed");
            return Err(ProviderError::Rejected(message));
        }

        let body: RefreshResponse = response.json().await?;
        let id_token = SecretString::from(body.id_token);
        let expires_at = Instant::now() + parse_expires_in(&body.expires_in);

        // The session may have been signed out while the refresh was in
        // flight; only update it if it is still present.
        if let Some(session) = self.lock_session().as_mut() {
            session.id_token = id_token.clone();
            session.refresh_token = SecretString::from(body.refresh_token);
            session.expires_at = expires_at;
        }

        Ok(id_token)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Deliver the current state immediately, like the provider's own
        // auth-state callback does on registration.
        let _ = tx.send(self.current_identity());
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(tx);
        rx
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.auth_endpoint,
            self.api_key.expose_secret()
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = read_provider_error(response).await;
            return Err(map_sign_in_error(status, &message));
        }

        let body: SignInResponse = response.json().await?;
        let identity = Identity::new(
            body.local_id,
            body.email.as_deref().and_then(|e| Email::parse(e).ok()),
        );

        *self.lock_session() = Some(FirebaseSession {
            identity: identity.clone(),
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
            expires_at: Instant::now() + parse_expires_in(&body.expires_in),
        });

        tracing::info!(uid = %identity.uid, "signed in");
        self.broadcast(Some(&identity));
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), ProviderError> {
        let was_signed_in = self.lock_session().take().is_some();
        if was_signed_in {
            tracing::info!("signed out");
        }
        self.broadcast(None);
        Ok(())
    }
}

#[async_trait]
impl TokenSource for FirebaseAuth {
    async fn bearer_token(&self) -> Result<SecretString, ProviderError> {
        let (token, needs_refresh) = {
            let session = self.lock_session();
            let Some(session) = session.as_ref() else {
                return Err(ProviderError::NotSignedIn);
            };
            let fresh = session.expires_at > Instant::now() + TOKEN_EXPIRY_LEEWAY;
            if fresh {
                (session.id_token.clone(), None)
            } else {
                (
                    session.id_token.clone(),
                    Some(session.refresh_token.clone()),
                )
            }
        };

        match needs_refresh {
            None => Ok(token),
            Some(refresh_token) => self.refresh(refresh_token).await,
        }
    }
}

// =============================================================================
// Wire types & helpers
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Extract the provider's error message from a failed response body.
async fn read_provider_error(response: reqwest::Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    serde_json::from_str::<ProviderErrorBody>(&raw)
        .map_or_else(|_| raw.chars().take(200).collect(), |b| b.error.message)
}

/// Map a failed sign-in to the error taxonomy.
fn map_sign_in_error(status: reqwest::StatusCode, message: &str) -> ProviderError {
    const CREDENTIAL_CODES: &[&str] = &[
        "INVALID_LOGIN_CREDENTIALS",
        "INVALID_PASSWORD",
        "EMAIL_NOT_FOUND",
        "USER_DISABLED",
    ];
    if status == reqwest::StatusCode::BAD_REQUEST
        && CREDENTIAL_CODES.iter().any(|code| message.contains(code))
    {
        ProviderError::InvalidCredentials
    } else {
        ProviderError::Rejected(message.to_owned())
    }
}

/// Parse Firebase's stringly-typed `expiresIn` seconds, defaulting to an hour
/// (the documented token lifetime) when unparseable.
fn parse_expires_in(raw: &str) -> Duration {
    Duration::from_secs(raw.parse().unwrap_or(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> FirebaseAuth {
        FirebaseAuth::new(SecretString::from("test-api-key"))
    }

    #[test]
    fn subscribe_delivers_current_state_immediately() {
        let auth = auth();
        let mut rx = auth.subscribe();
        assert_eq!(rx.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn sign_out_broadcasts_none_and_is_idempotent() {
        let auth = auth();
        let mut rx = auth.subscribe();
        let _ = rx.try_recv(); // initial state

        auth.sign_out().await.expect("sign out");
        assert_eq!(rx.try_recv(), Ok(None));

        auth.sign_out().await.expect("second sign out");
        assert_eq!(rx.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn bearer_token_without_session_is_not_signed_in() {
        let auth = auth();
        assert!(matches!(
            auth.bearer_token().await,
            Err(ProviderError::NotSignedIn)
        ));
    }

    #[test]
    fn sign_in_error_mapping() {
        let bad = reqwest::StatusCode::BAD_REQUEST;
        assert!(matches!(
            map_sign_in_error(bad, "INVALID_LOGIN_CREDENTIALS"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            map_sign_in_error(bad, "EMAIL_NOT_FOUND"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            map_sign_in_error(bad, "TOO_MANY_ATTEMPTS_TRY_LATER"),
            ProviderError::Rejected(_)
        ));
        assert!(matches!(
            map_sign_in_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ProviderError::Rejected(_)
        ));
    }

    #[test]
    fn expires_in_parses_with_fallback() {
        assert_eq!(parse_expires_in("3600"), Duration::from_secs(3600));
        assert_eq!(parse_expires_in("junk"), Duration::from_secs(3600));
        assert_eq!(parse_expires_in("120"), Duration::from_secs(120));
    }
}
