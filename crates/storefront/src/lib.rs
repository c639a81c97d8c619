//! Mirabel Storefront application core.
//!
//! The state layer behind the Mirabel Wine storefront UI. The UI itself
//! (pages, styling, forms) lives elsewhere; this crate owns the parts with
//! real state-machine behavior:
//!
//! - [`cart::CartStore`] - the working cart, mirrored to durable local
//!   storage on every mutation
//! - [`session::SessionObserver`] - current identity + loading flag over an
//!   identity provider's auth-state subscription
//! - [`sync::CartSynchronizer`] - reconciles the local working cart with the
//!   per-user remote cart record across login/logout transitions
//! - [`gateway::ApiClient`] - bearer-authenticated client for the CRUD proxy
//!   (carts, catalog, events, orders)
//!
//! # Wiring
//!
//! Components are constructed explicitly and injected - no ambient globals.
//! A typical application wires them like this:
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let auth = Arc::new(FirebaseAuth::new(config.firebase_api_key.clone()));
//! let observer = SessionObserver::new(Arc::clone(&auth), config.admin_emails.clone());
//! let storage = Arc::new(LocalStore::new(&config.storage_dir));
//! let cart = Arc::new(CartStore::new(Arc::clone(&storage)));
//! let api = ApiClient::new(config.api_base_url.clone(), Arc::clone(&auth));
//! let sync = CartSynchronizer::new(Arc::clone(&cart), Arc::new(api.clone()));
//!
//! // One consumer loop applies identity transitions in provider order.
//! sync::drive(&observer, &sync).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod gateway;
pub mod session;
pub mod storage;
pub mod sync;

pub use cart::CartStore;
pub use checkout::{CheckoutError, CheckoutForm, place_order};
pub use config::StorefrontConfig;
pub use gateway::{ApiClient, CartGateway, GatewayError};
pub use session::{
    AuthState, IdentityTransition, SessionObserver,
    provider::{FirebaseAuth, IdentityProvider, ProviderError, TokenSource},
};
pub use storage::LocalStore;
pub use sync::{CartSynchronizer, SyncPhase};
