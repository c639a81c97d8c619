//! Authentication extractors.
//!
//! [`Caller`] verifies the request's bearer token and yields the caller's
//! identity; [`AdminCaller`] additionally requires membership in the admin
//! allow-list. Handlers state their requirement in the signature instead of
//! relying on a route-group layer.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use mirabel_core::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for any authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Caller(identity): Caller) -> impl IntoResponse {
///     format!("hello {}", identity.uid)
/// }
/// ```
pub struct Caller(pub Identity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.verifier().verify(token).await?;
        Ok(Self(identity))
    }
}

/// Extractor for a caller on the admin allow-list.
pub struct AdminCaller(pub Identity);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        let is_admin = identity
            .email
            .as_ref()
            .is_some_and(|email| state.config().is_admin(email));
        if !is_admin {
            return Err(ApiError::AdminRequired);
        }
        Ok(Self(identity))
    }
}

/// Pull the bearer token out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingAuth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/events");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[test]
    fn bearer_token_extracts_the_token() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).expect("token"), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_rejects_missing_header() {
        let parts = parts_with_auth(None);
        assert!(matches!(bearer_token(&parts), Err(ApiError::MissingAuth)));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty_tokens() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&parts), Err(ApiError::MissingAuth)));

        let parts = parts_with_auth(Some("Bearer "));
        assert!(matches!(bearer_token(&parts), Err(ApiError::MissingAuth)));
    }
}
