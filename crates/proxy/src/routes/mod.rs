//! HTTP route handlers for the CRUD proxy.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Health check (no auth)
//!
//! # Catalog
//! GET    /api/products            - Product list (no auth)
//! POST   /api/products            - Create product (admin)
//! PUT    /api/products/{id}       - Update product (admin)
//! DELETE /api/products/{id}       - Delete product (admin)
//!
//! # Events
//! GET    /api/events              - Event list, newest first (any caller)
//! POST   /api/events              - Create event (admin)
//! PUT    /api/events/{id}         - Update event (admin)
//! DELETE /api/events/{id}         - Delete event (admin)
//!
//! # Carts (caller must match {user_id})
//! GET    /api/carts/{user_id}     - Fetch the remote cart record (404 when absent)
//! POST   /api/carts/{user_id}     - Insert-or-replace the cart record
//! DELETE /api/carts/{user_id}     - Delete the cart record (idempotent)
//!
//! # Orders (caller must match)
//! POST   /api/orders              - Record an order (checkout)
//! GET    /api/orders/{user_id}    - Order history, newest first
//! ```
//!
//! Every response is a `{data, error}` envelope; see [`crate::error`] for the
//! status mapping.

pub mod carts;
pub mod events;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use mirabel_core::Identity;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Create the event routes router.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list).post(events::create))
        .route("/{id}", axum::routing::put(events::update).delete(events::remove))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route(
        "/{user_id}",
        get(carts::fetch).post(carts::upsert).delete(carts::remove),
    )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/{user_id}", get(orders::list_for_user))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            axum::routing::put(products::update).delete(products::remove),
        )
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/events", event_routes())
        .nest("/api/carts", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/products", product_routes())
}

/// Reject callers touching a resource owned by someone else.
pub(crate) fn ensure_owner(caller: &Identity, user_id: &str) -> Result<()> {
    if caller.uid.as_str() == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "resource belongs to another user".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirabel_core::{Email, Identity};

    #[test]
    fn ensure_owner_matches_on_uid() {
        let caller = Identity::new("u1", Some(Email::parse("a@b.c").expect("valid")));
        assert!(ensure_owner(&caller, "u1").is_ok());
        assert!(matches!(
            ensure_owner(&caller, "u2"),
            Err(ApiError::Forbidden(_))
        ));
    }
}
