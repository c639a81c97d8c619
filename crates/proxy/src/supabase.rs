//! Supabase REST (PostgREST) client.
//!
//! The proxy is a pass-through: every route forwards onto the hosted
//! database's REST interface using the service-role key. No query engine of
//! our own, no local persistence.
//!
//! PostgREST conventions used here:
//! - filters are query parameters like `user_id=eq.<value>`
//! - `Prefer: return=representation` makes mutations return affected rows
//! - `Prefer: resolution=merge-duplicates` turns an insert into an upsert

use std::sync::Arc;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::config::ProxyConfig;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase returned a non-success status.
    #[error("Supabase returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body excerpt.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for a Supabase project's REST interface.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: String,
    service_key: SecretString,
}

impl SupabaseClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &ProxyConfig) -> Self {
        Self::with_url(
            &config.supabase_url,
            config.supabase_service_role_key.clone(),
        )
    }

    /// Create a client against an explicit project URL (tests).
    #[must_use]
    pub fn with_url(project_url: &str, service_key: SecretString) -> Self {
        let rest_url = format!("{}/rest/v1", project_url.trim_end_matches('/'));
        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                rest_url,
                service_key,
            }),
        }
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        let key = self.inner.service_key.expose_secret();
        self.inner
            .client
            .request(method, format!("{}/{table}", self.inner.rest_url))
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Read the rows a response returns, or a `Status` error.
    async fn read_rows<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, SupabaseError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Supabase returned non-success status"
            );
            return Err(SupabaseError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Select rows from `table`. `query` carries PostgREST filter/order
    /// parameters, e.g. `[("user_id", "eq.abc"), ("order", "date.desc")]`.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError`] if the request fails.
    #[instrument(skip(self, query), fields(table = %table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::GET, table)
            .query(query)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    /// Insert `rows` into `table`, returning the stored representations.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError`] if the request fails.
    #[instrument(skip(self, rows), fields(table = %table))]
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        rows: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    /// Insert-or-replace `rows` keyed by the table's primary key.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError`] if the request fails.
    #[instrument(skip(self, rows), fields(table = %table))]
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        rows: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    /// Update rows matching `query` with `patch`, returning the updated rows.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError`] if the request fails.
    #[instrument(skip(self, query, patch), fields(table = %table))]
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        patch: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::PATCH, table)
            .query(query)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    /// Delete rows matching `query`, returning the deleted rows (may be
    /// empty: deleting nothing is not an error).
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError`] if the request fails.
    #[instrument(skip(self, query), fields(table = %table))]
    pub async fn delete(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<serde_json::Value>, SupabaseError> {
        let response = self
            .request(Method::DELETE, table)
            .query(query)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::read_rows(response).await
    }
}

/// Format a PostgREST equality filter value.
#[must_use]
pub fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_formats_postgrest_filters() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(eq("user@example.com"), "eq.user@example.com");
    }

    #[test]
    fn rest_url_is_normalized() {
        let client = SupabaseClient::with_url(
            "https://abc.supabase.co/",
            SecretString::from("service-key"),
        );
        assert_eq!(client.inner.rest_url, "https://abc.supabase.co/rest/v1");
    }
}
