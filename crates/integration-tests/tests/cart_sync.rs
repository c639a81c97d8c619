//! Cart synchronizer scenarios: login restore, logout persist, failure
//! tolerance, and stale-resolution fencing.

use std::sync::Arc;

use mirabel_core::{Cart, CartLine, Price, Product, ProductId};
use mirabel_integration_tests::{StubGateway, identity};
use mirabel_storefront::cart::CartStore;
use mirabel_storefront::session::IdentityTransition;
use mirabel_storefront::storage::{LocalStore, user_cart_key};
use mirabel_storefront::sync::{CartSynchronizer, SyncPhase};

fn product(id: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("wine-{id}"),
        price: Price::from_minor(1000 * id),
        image: format!("https://img.example/{id}.jpg"),
        description: None,
        featured: false,
    }
}

fn cart_of(entries: &[(i64, u32)]) -> Cart {
    Cart::from_lines(
        entries
            .iter()
            .map(|&(id, qty)| CartLine::from_product(&product(id), qty))
            .collect(),
    )
}

struct Fixture {
    storage: Arc<LocalStore>,
    cart: Arc<CartStore>,
    gateway: Arc<StubGateway>,
    sync: CartSynchronizer<StubGateway>,
}

fn fixture() -> Fixture {
    let storage = Arc::new(LocalStore::in_memory());
    let cart = Arc::new(CartStore::new(Arc::clone(&storage)));
    let gateway = Arc::new(StubGateway::new());
    let sync = CartSynchronizer::new(Arc::clone(&cart), Arc::clone(&gateway));
    Fixture {
        storage,
        cart,
        gateway,
        sync,
    }
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_replaces_guest_cart_with_remote() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    // Guest cart [{id:1, qty:2}]; remote cart [{id:5, qty:1}].
    f.cart.add_line(&product(1), 2);
    f.gateway.set_remote("u1", cart_of(&[(5, 1)]));

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;

    // Replacement, not merge: the guest line is discarded.
    assert_eq!(f.cart.snapshot(), cart_of(&[(5, 1)]));
    assert_eq!(f.sync.phase(), SyncPhase::Authenticated(user));
}

#[tokio::test]
async fn login_without_remote_record_keeps_guest_cart() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    f.cart.add_line(&product(1), 2);
    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;

    assert_eq!(f.cart.snapshot(), cart_of(&[(1, 2)]));
    assert_eq!(f.sync.phase(), SyncPhase::Authenticated(user));
}

#[tokio::test]
async fn login_with_empty_remote_cart_keeps_guest_cart() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    f.cart.add_line(&product(1), 2);
    f.gateway.set_remote("u1", Cart::new());

    f.sync.apply(IdentityTransition::SignedIn(user)).await;

    assert_eq!(f.cart.snapshot(), cart_of(&[(1, 2)]));
}

#[tokio::test]
async fn login_fetch_failure_keeps_local_cart_and_still_authenticates() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    f.cart.add_line(&product(1), 2);
    f.gateway.fail_fetches(true);

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;

    // Availability over consistency: the transition completes regardless.
    assert_eq!(f.cart.snapshot(), cart_of(&[(1, 2)]));
    assert_eq!(f.sync.phase(), SyncPhase::Authenticated(user));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_persists_cart_locally_and_remotely_then_clears() {
    let f = fixture();
    let user = identity("u7", "user@example.com");

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
    f.cart.add_line(&product(7), 3);

    f.sync.apply(IdentityTransition::SignedOut(user.clone())).await;

    let expected = cart_of(&[(7, 3)]);
    assert_eq!(f.gateway.remote_cart("u7"), Some(expected.clone()));
    assert_eq!(
        f.storage.read_cart(&user_cart_key(user.user_key())),
        Some(expected)
    );
    assert!(f.cart.snapshot().is_empty());
    assert_eq!(f.sync.phase(), SyncPhase::Anonymous);
}

#[tokio::test]
async fn logout_with_empty_cart_deletes_remote_and_local_snapshot() {
    let f = fixture();
    let user = identity("u1", "user@example.com");
    let key = user_cart_key(user.user_key());

    // Leftovers from an earlier session.
    f.gateway.set_remote("u1", cart_of(&[(3, 1)]));
    f.storage.write_cart(&key, &cart_of(&[(3, 1)]));

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
    f.cart.clear();
    f.sync.apply(IdentityTransition::SignedOut(user)).await;

    // Deleted, not written as an empty list.
    assert_eq!(f.gateway.remote_cart("u1"), None);
    assert!(!f.storage.contains(&key));
    assert!(f.cart.snapshot().is_empty());
}

#[tokio::test]
async fn logout_remote_failure_still_clears_and_keeps_local_snapshot() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
    f.cart.add_line(&product(2), 4);
    f.gateway.fail_upserts(true);

    f.sync.apply(IdentityTransition::SignedOut(user.clone())).await;

    // The local snapshot was written before the remote call; the working
    // cart clears regardless of the persist outcome.
    assert_eq!(f.gateway.remote_cart("u1"), None);
    assert_eq!(
        f.storage.read_cart(&user_cart_key(user.user_key())),
        Some(cart_of(&[(2, 4)]))
    );
    assert!(f.cart.snapshot().is_empty());
    assert_eq!(f.sync.phase(), SyncPhase::Anonymous);
}

// =============================================================================
// Stale-resolution fencing
// =============================================================================

#[tokio::test]
async fn stale_login_fetch_is_discarded_after_logout() {
    let f = fixture();
    let user = identity("u1", "user@example.com");
    f.gateway.set_remote("u1", cart_of(&[(5, 1)]));

    // Hold the login fetch in flight, log out, then let the fetch resolve.
    let release = f.gateway.hold_next_fetch().await;
    let login = f.sync.apply(IdentityTransition::SignedIn(user.clone()));
    let logout_then_release = async {
        // Give the login future a chance to reach the gate first.
        tokio::task::yield_now().await;
        f.sync.apply(IdentityTransition::SignedOut(user.clone())).await;
        let _ = release.send(());
    };
    tokio::join!(login, logout_then_release);

    // The stale fetch result must not clobber the post-logout state.
    assert!(f.cart.snapshot().is_empty());
    assert_eq!(f.sync.phase(), SyncPhase::Anonymous);
}

#[tokio::test]
async fn stale_logout_resolution_does_not_clobber_new_login() {
    let f = fixture();
    let user = identity("u1", "user@example.com");
    f.gateway.set_remote("u1", cart_of(&[(9, 2)]));
    f.cart.add_line(&product(1), 1);

    // Hold the logout persist in flight, log back in (restoring the remote
    // cart), then let the persist resolve.
    let release = f.gateway.hold_next_upsert().await;
    let logout = f.sync.apply(IdentityTransition::SignedOut(user.clone()));
    let login_then_release = async {
        tokio::task::yield_now().await;
        f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
        let _ = release.send(());
    };
    tokio::join!(logout, login_then_release);

    // The stale logout's clear must not wipe the newly restored cart.
    assert_eq!(f.cart.snapshot(), cart_of(&[(9, 2)]));
    assert_eq!(f.sync.phase(), SyncPhase::Authenticated(user));
}

// =============================================================================
// Checkout & shutdown hooks
// =============================================================================

#[tokio::test]
async fn checkout_deletes_remote_record_and_clears_working_cart() {
    let f = fixture();
    let user = identity("u1", "user@example.com");
    f.gateway.set_remote("u1", cart_of(&[(5, 1)]));

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
    assert!(!f.cart.snapshot().is_empty());

    f.sync.checkout_completed(&user).await;

    assert_eq!(f.gateway.remote_cart("u1"), None);
    assert!(f.cart.snapshot().is_empty());
}

#[tokio::test]
async fn shutdown_persists_a_signed_in_users_cart_best_effort() {
    let f = fixture();
    let user = identity("u1", "user@example.com");

    f.sync.apply(IdentityTransition::SignedIn(user.clone())).await;
    f.cart.add_line(&product(3), 2);

    f.sync.shutdown().await;

    let expected = cart_of(&[(3, 2)]);
    assert_eq!(f.gateway.remote_cart("u1"), Some(expected.clone()));
    assert_eq!(
        f.storage.read_cart(&user_cart_key(user.user_key())),
        Some(expected)
    );
    // Shutdown does not clear: the process is going away anyway.
    assert!(!f.cart.snapshot().is_empty());
}

#[tokio::test]
async fn shutdown_while_anonymous_touches_nothing() {
    let f = fixture();
    f.cart.add_line(&product(1), 1);

    f.sync.shutdown().await;

    assert_eq!(f.gateway.remote_cart("u1"), None);
    assert!(!f.storage.contains(&user_cart_key("user@example.com")));
}
