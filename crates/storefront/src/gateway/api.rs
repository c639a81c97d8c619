//! HTTP client for the Mirabel CRUD proxy.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use mirabel_core::{Cart, CartRecord, Envelope, EventRecord, Order, Product, UserUid};

use crate::session::provider::TokenSource;

use super::{CartGateway, GatewayError};

/// Client for the CRUD proxy's `/api` surface.
///
/// Cheaply cloneable via `Arc`; one instance is shared between the cart
/// synchronizer and the catalog read paths.
pub struct ApiClient<T> {
    inner: Arc<ApiClientInner<T>>,
}

struct ApiClientInner<T> {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TokenSource> ApiClient<T> {
    /// Create a client for the proxy at `base_url`, drawing bearer
    /// credentials from `tokens`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, tokens: Arc<T>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.into(),
                tokens,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url.trim_end_matches('/'))
    }

    /// Build a request carrying the current identity's bearer credential.
    async fn authed(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let token = self.inner.tokens.bearer_token().await?;
        Ok(self
            .inner
            .client
            .request(method, self.url(path))
            .bearer_auth(token.expose_secret()))
    }

    async fn read_envelope<D: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<D, GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }

    // =========================================================================
    // Catalog / events / orders read paths
    // =========================================================================

    /// List catalog products. Public: no credential required.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.url("/api/products"))
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// List events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails or the credential is
    /// missing/expired.
    #[instrument(skip(self))]
    pub async fn events(&self) -> Result<Vec<EventRecord>, GatewayError> {
        let response = self.authed(Method::GET, "/api/events").await?.send().await?;
        Self::read_envelope(response).await
    }

    /// List the orders placed by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails or the caller is not
    /// `user_id`.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn orders_for(&self, user_id: &UserUid) -> Result<Vec<Order>, GatewayError> {
        let path = format!("/api/orders/{user_id}");
        let response = self.authed(Method::GET, &path).await?.send().await?;
        Self::read_envelope(response).await
    }

    /// Create an order (checkout). Returns the stored record with its
    /// server-assigned id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for a rejected body, or other
    /// variants per the failure taxonomy.
    #[instrument(skip(self, order), fields(user = %order.user_id))]
    pub async fn create_order(&self, order: &Order) -> Result<Order, GatewayError> {
        let response = self
            .authed(Method::POST, "/api/orders")
            .await?
            .json(order)
            .send()
            .await?;
        Self::read_envelope(response).await
    }
}

#[async_trait]
impl<T: TokenSource> CartGateway for ApiClient<T> {
    #[instrument(skip(self), fields(user = %user_id))]
    async fn fetch_cart(&self, user_id: &UserUid) -> Result<Option<Cart>, GatewayError> {
        let path = format!("/api/carts/{user_id}");
        let response = self.authed(Method::GET, &path).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record: CartRecord = Self::read_envelope(response).await?;
        Ok(Some(record.cart))
    }

    #[instrument(skip(self, cart), fields(user = %user_id, lines = cart.len()))]
    async fn upsert_cart(&self, user_id: &UserUid, cart: &Cart) -> Result<(), GatewayError> {
        let path = format!("/api/carts/{user_id}");
        let response = self
            .authed(Method::POST, &path)
            .await?
            .json(cart)
            .send()
            .await?;
        let _: CartRecord = Self::read_envelope(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user_id))]
    async fn delete_cart(&self, user_id: &UserUid) -> Result<(), GatewayError> {
        let path = format!("/api/carts/{user_id}");
        let response = self.authed(Method::DELETE, &path).await?.send().await?;
        let _: serde_json::Value = Self::read_envelope(response).await?;
        Ok(())
    }
}

/// Decode a proxy response into its envelope payload or the mapped error.
fn decode_envelope<D: DeserializeOwned>(status: StatusCode, body: &str) -> Result<D, GatewayError> {
    if status.is_success() {
        let envelope: Envelope<D> = serde_json::from_str(body)
            .map_err(|e| GatewayError::Transient(format!("malformed response: {e}")))?;
        return envelope
            .data
            .ok_or_else(|| GatewayError::Transient("response envelope had no data".to_owned()));
    }

    let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .unwrap_or_else(|| format!("HTTP {status}"));

    Err(match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthenticated,
        StatusCode::FORBIDDEN => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(message)
        }
        _ => GatewayError::Transient(message),
    })
}
