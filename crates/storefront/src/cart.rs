//! The working cart: the single cart the UI reads and writes.
//!
//! Every mutation persists the full line list to the anonymous durable key
//! (whole-list writes, not incremental - O(n) serialization per mutation is
//! fine at shop scale) and notifies subscribers with a fresh snapshot for UI
//! reactivity. Persistence failures never surface to callers; the store
//! degrades to in-memory behavior (see [`crate::storage`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use mirabel_core::{Cart, CartLine, Product, ProductId};

use crate::storage::{ANON_CART_KEY, LocalStore, user_cart_key};

/// The in-memory working cart, mirrored to durable local storage.
pub struct CartStore {
    storage: Arc<LocalStore>,
    working: Mutex<Cart>,
    changes: watch::Sender<Cart>,
}

impl CartStore {
    /// Create a store, restoring the anonymous working cart from durable
    /// storage when present.
    #[must_use]
    pub fn new(storage: Arc<LocalStore>) -> Self {
        let initial = storage.read_cart(ANON_CART_KEY).unwrap_or_default();
        let (changes, _) = watch::channel(initial.clone());
        Self {
            storage,
            working: Mutex::new(initial),
            changes,
        }
    }

    /// Add `qty` of `product`, merging with an existing line for the same
    /// product.
    pub fn add_line(&self, product: &Product, qty: u32) {
        self.mutate(|cart| cart.add(CartLine::from_product(product, qty)));
    }

    /// Remove the line for `id`; no-op if absent.
    pub fn remove_line(&self, id: ProductId) {
        self.mutate(|cart| cart.remove(id));
    }

    /// Set a line's quantity directly (quantity inputs). Zero removes the
    /// line; validation beyond that is a UI concern.
    pub fn set_qty(&self, id: ProductId, qty: u32) {
        self.mutate(|cart| cart.set_qty(id, qty));
    }

    /// Empty the working cart.
    pub fn clear(&self) {
        self.mutate(Cart::clear);
    }

    /// Replace the working cart wholesale (login restore path).
    pub fn replace(&self, cart: Cart) {
        self.mutate(|working| *working = cart);
    }

    /// A snapshot of the current working cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock_working().clone()
    }

    /// Write the current working cart to `user_key`'s durable snapshot key.
    pub fn snapshot_for(&self, user_key: &str) {
        let cart = self.snapshot();
        self.storage.write_cart(&user_cart_key(user_key), &cart);
    }

    /// Replace the working cart from `user_key`'s durable snapshot key, if
    /// one exists; no-op otherwise.
    pub fn restore_for(&self, user_key: &str) {
        if let Some(cart) = self.storage.read_cart(&user_cart_key(user_key)) {
            self.replace(cart);
        }
    }

    /// Delete `user_key`'s durable snapshot key.
    pub fn remove_snapshot_for(&self, user_key: &str) {
        self.storage.remove(&user_cart_key(user_key));
    }

    /// Subscribe to working-cart changes. The receiver always observes the
    /// latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.changes.subscribe()
    }

    /// Apply a mutation, then persist to the anonymous key and notify
    /// subscribers.
    fn mutate(&self, f: impl FnOnce(&mut Cart)) {
        let snapshot = {
            let mut working = self.lock_working();
            f(&mut working);
            working.clone()
        };
        self.storage.write_cart(ANON_CART_KEY, &snapshot);
        self.changes.send_replace(snapshot);
    }

    fn lock_working(&self) -> MutexGuard<'_, Cart> {
        self.working.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
