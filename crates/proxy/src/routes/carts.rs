//! Per-user remote cart record routes.
//!
//! The cart synchronizer's four operations land here: fetch, upsert, delete,
//! with "no record" expressed as a 404 the client treats as a valid state.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use mirabel_core::{Cart, CartRecord, Envelope, UserUid};

use crate::error::{ApiError, Result};
use crate::middleware::Caller;
use crate::state::AppState;
use crate::supabase::eq;

/// Fetch the remote cart record for `user_id`.
#[instrument(skip(state, caller), fields(user = %user_id))]
pub async fn fetch(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Caller(caller): Caller,
) -> Result<Json<Envelope<CartRecord>>> {
    super::ensure_owner(&caller, &user_id)?;

    let filter = eq(&user_id);
    let rows: Vec<CartRecord> = state
        .supabase()
        .select("carts", &[("user_id", filter.as_str())])
        .await?;

    let record = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("no cart for {user_id}")))?;
    Ok(Json(Envelope::ok(record)))
}

/// Insert-or-replace the remote cart record for `user_id`.
#[instrument(skip(state, caller, body), fields(user = %user_id))]
pub async fn upsert(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Caller(caller): Caller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<CartRecord>>> {
    super::ensure_owner(&caller, &user_id)?;

    let cart: Cart = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("cart must be an array of cart lines: {e}")))?;

    let record = CartRecord {
        user_id: UserUid::new(user_id),
        cart,
    };
    let rows: Vec<CartRecord> = state.supabase().upsert("carts", &[record]).await?;

    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("upsert returned no rows".to_owned()))?;
    Ok(Json(Envelope::ok(stored)))
}

/// Delete the remote cart record for `user_id`. Deleting a non-existent
/// record is not an error.
#[instrument(skip(state, caller), fields(user = %user_id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Caller(caller): Caller,
) -> Result<Json<Envelope<serde_json::Value>>> {
    super::ensure_owner(&caller, &user_id)?;

    let filter = eq(&user_id);
    let removed = state
        .supabase()
        .delete("carts", &[("user_id", filter.as_str())])
        .await?;

    Ok(Json(Envelope::ok(
        serde_json::json!({ "deleted": removed.len() }),
    )))
}
