//! Unified error handling with the `{data, error}` envelope.
//!
//! Every route handler returns `Result<T, ApiError>`; failures render as the
//! envelope with the appropriate status. Upstream (Supabase/verifier) faults
//! are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use mirabel_core::Envelope;

use crate::auth::VerifyError;
use crate::supabase::SupabaseError;

/// Application-level error type for the proxy.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable `Authorization: Bearer` header on the request.
    #[error("No valid authorization header")]
    MissingAuth,

    /// The bearer token was rejected by the identity provider.
    #[error("Invalid token")]
    InvalidToken,

    /// Authenticated, but the route needs an admin allow-list member.
    #[error("Admin access required")]
    AdminRequired,

    /// Authenticated, but not permitted to touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No record for the requested key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request body.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Supabase operation failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Token verification infrastructure failed (not an invalid token).
    #[error("Token verification unavailable: {0}")]
    VerifierUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<VerifyError> for ApiError {
    fn from(error: VerifyError) -> Self {
        match error {
            VerifyError::InvalidToken => Self::InvalidToken,
            VerifyError::Http(e) => Self::VerifierUnavailable(e.to_string()),
            VerifyError::Upstream(message) => Self::VerifierUnavailable(message),
        }
    }
}

impl ApiError {
    /// The response status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingAuth | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::AdminRequired | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Supabase(_) | Self::VerifierUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message. Upstream and internal details stay out of
    /// responses.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Supabase(_) => "Upstream database error".to_owned(),
            Self::VerifierUnavailable(_) => "Token verification unavailable".to_owned(),
            Self::Internal(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture infrastructure failures to Sentry
        if matches!(
            self,
            Self::Supabase(_) | Self::VerifierUnavailable(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let envelope: Envelope<serde_json::Value> = Envelope::failure(self.public_message());
        (self.status(), Json(envelope)).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;
