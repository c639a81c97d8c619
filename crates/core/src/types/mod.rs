//! Core types for Mirabel.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! wire records exchanged with the CRUD proxy and Supabase.

mod cart;
mod email;
mod id;
mod identity;
mod price;
mod records;

pub use cart::{Cart, CartLine};
pub use email::{Email, EmailError};
pub use id::{EventId, OrderId, ProductId, UserUid};
pub use identity::Identity;
pub use price::{Currency, Price};
pub use records::{CartRecord, Envelope, EventRecord, Order, Product};
