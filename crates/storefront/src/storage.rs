//! Durable local key-value storage.
//!
//! The browser-profile analog: one JSON file per key under a per-installation
//! directory. Carts are stored under the anonymous key [`ANON_CART_KEY`] and
//! per-user snapshot keys produced by [`user_cart_key`].
//!
//! Storage is strictly best-effort. A missing directory, full disk, or
//! read-only filesystem must never take the cart UI down, so every failure is
//! logged and swallowed and the store degrades to in-memory-only behavior for
//! the life of the process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mirabel_core::Cart;

/// Key for the anonymous (guest/working) cart.
pub const ANON_CART_KEY: &str = "cart";

/// Key for a specific identity's cart snapshot.
#[must_use]
pub fn user_cart_key(user_key: &str) -> String {
    format!("cart_{user_key}")
}

/// Best-effort durable key-value store backed by one JSON file per key.
///
/// An in-memory overlay always holds the latest value written in this
/// process, so reads stay consistent even when the disk is unavailable.
pub struct LocalStore {
    dir: Option<PathBuf>,
    overlay: Mutex<HashMap<String, String>>,
}

impl LocalStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// If the directory cannot be created the store still works, memory-only,
    /// and a warning is logged once here.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        let dir = match fs::create_dir_all(dir) {
            Ok(()) => Some(dir.to_path_buf()),
            Err(error) => {
                tracing::warn!(dir = %dir.display(), %error, "local storage unavailable; carts will not survive restart");
                None
            }
        };
        Self {
            dir,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    /// A store with no backing directory, for tests and diskless fallback.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    /// Read the raw value for `key`, preferring the in-process overlay.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.lock_overlay().get(key) {
            return Some(value.clone());
        }
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => {
                tracing::warn!(key, %error, "local storage read failed");
                None
            }
        }
    }

    /// Write the raw value for `key`. Failures are swallowed.
    pub fn set(&self, key: &str, value: &str) {
        self.lock_overlay()
            .insert(key.to_owned(), value.to_owned());
        if let Some(path) = self.path_for(key)
            && let Err(error) = fs::write(&path, value)
        {
            tracing::warn!(key, %error, "local storage write failed; value kept in memory only");
        }
    }

    /// Remove `key` entirely (both overlay and file). Failures are swallowed.
    pub fn remove(&self, key: &str) {
        self.lock_overlay().remove(key);
        if let Some(path) = self.path_for(key)
            && let Err(error) = fs::remove_file(&path)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(key, %error, "local storage remove failed");
        }
    }

    /// Whether a value exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        if self.lock_overlay().contains_key(key) {
            return true;
        }
        self.path_for(key).is_some_and(|p| p.exists())
    }

    /// Read and decode a cart. A corrupt value is logged and treated as
    /// absent rather than crashing cart startup.
    #[must_use]
    pub fn read_cart(&self, key: &str) -> Option<Cart> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(cart) => Some(cart),
            Err(error) => {
                tracing::warn!(key, %error, "stored cart is not valid JSON; ignoring it");
                None
            }
        }
    }

    /// Encode and write a cart.
    pub fn write_cart(&self, key: &str, cart: &Cart) {
        match serde_json::to_string(cart) {
            Ok(json) => self.set(key, &json),
            Err(error) => tracing::warn!(key, %error, "cart serialization failed"),
        }
    }

    fn lock_overlay(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.overlay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_key(key))))
    }
}

/// Map a storage key to a safe file stem.
///
/// Keys include email addresses (`cart_user@example.com`); anything outside a
/// conservative character set becomes `_` so the key never escapes the
/// storage directory or hits filesystem-reserved characters.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirabel_core::{CartLine, Price, Product, ProductId};

    fn sample_cart() -> Cart {
        let product = Product {
            id: ProductId::new(1),
            name: "Estate Red".to_owned(),
            price: Price::from_minor(1_500_000),
            image: "https://img.example/red.jpg".to_owned(),
            description: None,
            featured: false,
        };
        Cart::from_lines(vec![CartLine::from_product(&product, 2)])
    }

    #[test]
    fn set_get_remove_roundtrip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path());
        store.set("cart", "[]");
        assert_eq!(store.get("cart").as_deref(), Some("[]"));
        assert!(store.contains("cart"));
        store.remove("cart");
        assert!(store.get("cart").is_none());
        assert!(!store.contains("cart"));
    }

    #[test]
    fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = LocalStore::new(dir.path());
            store.write_cart("cart", &sample_cart());
        }
        let reopened = LocalStore::new(dir.path());
        assert_eq!(reopened.read_cart("cart"), Some(sample_cart()));
    }

    #[test]
    fn in_memory_store_still_roundtrips() {
        let store = LocalStore::in_memory();
        store.write_cart("cart", &sample_cart());
        assert_eq!(store.read_cart("cart"), Some(sample_cart()));
        store.remove("cart");
        assert!(store.read_cart("cart").is_none());
    }

    #[test]
    fn unavailable_directory_degrades_to_memory() {
        // A file where the directory should be makes create_dir_all fail.
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "x").expect("write blocker");
        let store = LocalStore::new(&blocker);
        store.set("cart", "[]");
        assert_eq!(store.get("cart").as_deref(), Some("[]"));
    }

    #[test]
    fn corrupt_cart_reads_as_absent() {
        let store = LocalStore::in_memory();
        store.set("cart", "{not json");
        assert!(store.read_cart("cart").is_none());
    }

    #[test]
    fn user_keys_sanitize_to_safe_file_stems() {
        assert_eq!(sanitize_key("cart_user@example.com"), "cart_user@example.com");
        assert_eq!(sanitize_key("cart_../../etc/passwd"), "cart_.._.._etc_passwd");
    }

    #[test]
    fn user_cart_key_format() {
        assert_eq!(user_cart_key("user@example.com"), "cart_user@example.com");
        assert_eq!(user_cart_key("uid-1"), "cart_uid-1");
    }
}
