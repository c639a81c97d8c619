//! Order routes: record a checkout, list a user's order history.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use mirabel_core::{Envelope, Order, Price};

use crate::error::{ApiError, Result};
use crate::middleware::Caller;
use crate::state::AppState;
use crate::supabase::eq;

/// Record an order (write-once, at checkout).
///
/// The id, timestamp, and total are server-assigned: the total is recomputed
/// from the submitted items so a tampered client cannot understate it.
#[instrument(skip(state, caller, body))]
pub async fn create(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<Order>>> {
    let mut order: Order = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("malformed order: {e}")))?;

    super::ensure_owner(&caller, order.user_id.as_str())?;

    if order.items.is_empty() {
        return Err(ApiError::Validation(
            "order must contain at least one item".to_owned(),
        ));
    }
    if order.items.iter().any(|item| item.qty == 0) {
        return Err(ApiError::Validation(
            "order items must have a quantity of at least 1".to_owned(),
        ));
    }

    order.id = None;
    order.created_at = None;
    order.total = order
        .items
        .iter()
        .fold(Price::ZERO, |acc, item| acc.saturating_add(item.line_total()));

    let rows: Vec<Order> = state.supabase().insert("orders", &[order]).await?;
    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("insert returned no rows".to_owned()))?;
    Ok(Json(Envelope::ok(stored)))
}

/// List `user_id`'s orders, newest first.
#[instrument(skip(state, caller), fields(user = %user_id))]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Caller(caller): Caller,
) -> Result<Json<Envelope<Vec<Order>>>> {
    super::ensure_owner(&caller, &user_id)?;

    let filter = eq(&user_id);
    let orders: Vec<Order> = state
        .supabase()
        .select(
            "orders",
            &[("user_id", filter.as_str()), ("order", "created_at.desc")],
        )
        .await?;
    Ok(Json(Envelope::ok(orders)))
}
