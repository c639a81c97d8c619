//! Remote cart gateway and the CRUD proxy client.
//!
//! # Architecture
//!
//! - The cart synchronizer depends on the narrow [`CartGateway`] trait
//!   (fetch/upsert/delete of the per-user remote cart record), injected at
//!   construction so tests run against stubs.
//! - [`ApiClient`] is the production implementation: a `reqwest` client for
//!   the CRUD proxy, attaching a bearer credential obtained per call from a
//!   [`TokenSource`](crate::session::provider::TokenSource). It also carries
//!   the read-mostly catalog/events/orders channels, which share the same
//!   token mechanics.
//!
//! # Failure taxonomy
//!
//! [`GatewayError`] mirrors the proxy's status mapping. `NotFound` is a valid
//! state for cart fetches (surfaced as `Ok(None)`), not an error; `Transient`
//! failures are logged and abandoned by callers - the synchronizer never
//! auto-retries, favoring a usable cart UI over strict remote consistency.

mod api;

pub use api::ApiClient;

use async_trait::async_trait;

use mirabel_core::{Cart, UserUid};

use crate::session::provider::ProviderError;

/// Errors from the remote cart gateway and proxy client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or expired credential; do not retry without re-authenticating.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated but not permitted (admin-only routes, foreign user ids).
    #[error("not permitted")]
    Unauthorized,

    /// No record for the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The proxy rejected the request body.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Network or server failure; the operation may be retried later.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transient(error.to_string())
    }
}

impl From<ProviderError> for GatewayError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotSignedIn | ProviderError::InvalidCredentials => Self::Unauthenticated,
            ProviderError::Http(e) => Self::Transient(e.to_string()),
            ProviderError::Rejected(message) => Self::Transient(message),
        }
    }
}

/// The four-operation client for the per-user remote cart record.
#[async_trait]
pub trait CartGateway: Send + Sync + 'static {
    /// Fetch the remote cart for `user_id`. `Ok(None)` when no record exists
    /// (a valid state, not an error).
    async fn fetch_cart(&self, user_id: &UserUid) -> Result<Option<Cart>, GatewayError>;

    /// Insert-or-replace the remote cart record keyed by `user_id`.
    async fn upsert_cart(&self, user_id: &UserUid, cart: &Cart) -> Result<(), GatewayError>;

    /// Delete the remote cart record. Idempotent: deleting a non-existent
    /// record is not an error.
    async fn delete_cart(&self, user_id: &UserUid) -> Result<(), GatewayError>;
}
