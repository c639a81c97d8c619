//! Product catalog routes.
//!
//! The product list is public (the storefront shows the catalog before
//! login); mutations need the admin allow-list. Mutation bodies are forwarded
//! to Supabase as-is after a shape check - the proxy is a pass-through, not a
//! schema authority.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use mirabel_core::{Envelope, Product};

use crate::error::{ApiError, Result};
use crate::middleware::AdminCaller;
use crate::state::AppState;
use crate::supabase::eq;

/// List all products. Public.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Envelope<Vec<Product>>>> {
    let products: Vec<Product> = state.supabase().select("products", &[]).await?;
    Ok(Json(Envelope::ok(products)))
}

/// Create a product from the submitted fields.
#[instrument(skip(state, _admin, body))]
pub async fn create(
    State(state): State<AppState>,
    AdminCaller(_admin): AdminCaller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<Product>>> {
    let fields = as_object_without_server_fields(body)?;
    let rows: Vec<Product> = state.supabase().insert("products", &[fields]).await?;
    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("insert returned no rows".to_owned()))?;
    Ok(Json(Envelope::ok(stored)))
}

/// Update a product's fields.
#[instrument(skip(state, _admin, body), fields(product = id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AdminCaller(_admin): AdminCaller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<Product>>> {
    let fields = as_object_without_server_fields(body)?;

    let filter = eq(&id.to_string());
    let rows: Vec<Product> = state
        .supabase()
        .update("products", &[("id", filter.as_str())], &fields)
        .await?;

    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("no product with id {id}")))?;
    Ok(Json(Envelope::ok(stored)))
}

/// Delete a product, returning the deleted rows.
#[instrument(skip(state, _admin), fields(product = id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AdminCaller(_admin): AdminCaller,
) -> Result<Json<Envelope<Vec<serde_json::Value>>>> {
    let filter = eq(&id.to_string());
    let removed = state
        .supabase()
        .delete("products", &[("id", filter.as_str())])
        .await?;
    Ok(Json(Envelope::ok(removed)))
}

/// Require a JSON object body and strip server-assigned fields so a client
/// cannot smuggle its own id or timestamps into the table.
fn as_object_without_server_fields(
    body: serde_json::Value,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let serde_json::Value::Object(mut fields) = body else {
        return Err(ApiError::Validation(
            "request body must be a JSON object".to_owned(),
        ));
    };
    fields.remove("id");
    fields.remove("created_at");
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_server_assigned_fields() {
        let body = serde_json::json!({
            "id": 9,
            "created_at": "2026-01-01T00:00:00Z",
            "name": "Estate Red",
            "price": 1500000
        });
        let fields = as_object_without_server_fields(body).expect("object");
        assert!(!fields.contains_key("id"));
        assert!(!fields.contains_key("created_at"));
        assert_eq!(fields.get("name").and_then(|v| v.as_str()), Some("Estate Red"));
    }

    #[test]
    fn rejects_non_object_bodies() {
        let err = as_object_without_server_fields(serde_json::json!([1, 2, 3]))
            .expect_err("array body");
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
