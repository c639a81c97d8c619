//! Event CRUD routes.
//!
//! Reads need any verified caller; mutations need the admin allow-list.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use mirabel_core::{Envelope, EventRecord};

use crate::error::{ApiError, Result};
use crate::middleware::{AdminCaller, Caller};
use crate::state::AppState;
use crate::supabase::eq;

/// List all events, newest first.
#[instrument(skip(state, _caller))]
pub async fn list(
    State(state): State<AppState>,
    Caller(_caller): Caller,
) -> Result<Json<Envelope<Vec<EventRecord>>>> {
    let events: Vec<EventRecord> = state
        .supabase()
        .select("events", &[("order", "date.desc")])
        .await?;
    Ok(Json(Envelope::ok(events)))
}

/// Create a new event.
#[instrument(skip(state, _admin, body))]
pub async fn create(
    State(state): State<AppState>,
    AdminCaller(_admin): AdminCaller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<EventRecord>>> {
    let mut event: EventRecord = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("malformed event: {e}")))?;
    event.id = None;

    let rows: Vec<EventRecord> = state.supabase().insert("events", &[event]).await?;
    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("insert returned no rows".to_owned()))?;
    Ok(Json(Envelope::ok(stored)))
}

/// Update an existing event. The id in the body, if any, is ignored in favor
/// of the path parameter.
#[instrument(skip(state, _admin, body), fields(event = id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AdminCaller(_admin): AdminCaller,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Envelope<EventRecord>>> {
    let mut event: EventRecord = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("malformed event: {e}")))?;
    event.id = None;

    let filter = eq(&id.to_string());
    let rows: Vec<EventRecord> = state
        .supabase()
        .update("events", &[("id", filter.as_str())], &event)
        .await?;

    let stored = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("no event with id {id}")))?;
    Ok(Json(Envelope::ok(stored)))
}

/// Delete an event, returning the deleted rows.
#[instrument(skip(state, _admin), fields(event = id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AdminCaller(_admin): AdminCaller,
) -> Result<Json<Envelope<Vec<serde_json::Value>>>> {
    let filter = eq(&id.to_string());
    let removed = state
        .supabase()
        .delete("events", &[("id", filter.as_str())])
        .await?;
    Ok(Json(Envelope::ok(removed)))
}
