//! Mirabel Core - Shared types library.
//!
//! This crate provides common types used across all Mirabel components:
//! - `storefront` - The storefront application core (cart, session, sync)
//! - `proxy` - Thin CRUD proxy in front of Supabase
//! - `cli` - Command-line tools for seeding catalog data
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Carts, prices, emails, identities, and wire records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
