//! Wire records exchanged with the CRUD proxy and Supabase.
//!
//! These mirror the remote tables one-to-one; the proxy forwards them without
//! reshaping, so the same structs serve both sides of the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartLine};
use super::email::Email;
use super::id::{EventId, OrderId, ProductId, UserUid};
use super::price::Price;

/// A catalog product (`products` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Primary key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in minor units.
    pub price: Price,
    /// Image URL.
    pub image: String,
    /// Optional long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the product is featured on the home page.
    #[serde(default)]
    pub featured: bool,
}

/// A tasting or gala event (`events` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Primary key. Absent when creating a new event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    /// Event title.
    pub title: String,
    /// Calendar date of the event.
    pub date: NaiveDate,
    /// Free-form start time (e.g. "7:00 PM").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Event description.
    pub description: String,
    /// Promotional image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Ticket price in minor units, if ticketed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Seat capacity, if limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

/// The per-user remote cart record (`carts` table).
///
/// One record per identity, keyed by `user_id`; authoritative for a signed-in
/// user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    /// Owning user's UID.
    pub user_id: UserUid,
    /// The cart snapshot.
    pub cart: Cart,
}

/// An order placed at checkout (`orders` table). Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Primary key. Absent when creating a new order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    /// Owning user's UID.
    pub user_id: UserUid,
    /// Recipient name from the checkout form.
    pub name: String,
    /// Contact email from the checkout form.
    pub email: Email,
    /// Shipping address from the checkout form.
    pub address: String,
    /// Cart lines at the moment of checkout.
    pub items: Vec<CartLine>,
    /// Order total in minor units.
    pub total: Price,
    /// Server-assigned creation timestamp. Absent when creating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The `{ data, error }` response envelope used by the CRUD proxy.
///
/// Exactly one of the two fields is populated: `data` on success, `error`
/// with a non-2xx status on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Payload on success.
    pub data: Option<T>,
    /// Human-readable message on failure.
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// A success envelope.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failure envelope.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }
}
