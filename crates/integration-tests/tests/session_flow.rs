//! Full-loop scenarios: provider events flow through the session observer
//! into the cart synchronizer, in order.

use std::sync::Arc;

use mirabel_core::{Cart, CartLine, Price, Product, ProductId};
use mirabel_integration_tests::{StubGateway, StubProvider};
use mirabel_storefront::cart::CartStore;
use mirabel_storefront::session::SessionObserver;
use mirabel_storefront::session::provider::ProviderError;
use mirabel_storefront::storage::LocalStore;
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

#[tokio::test]
async fn login_restores_remote_cart_through_the_observer() {
    let provider = Arc::new(StubProvider::new());
    provider.register("user@example.com", "hunter2", "u1");

    let observer = SessionObserver::new(Arc::clone(&provider), vec![]);
    let storage = Arc::new(LocalStore::in_memory());
    let cart = Arc::new(CartStore::new(storage));
    let gateway = Arc::new(StubGateway::new());
    let sync = CartSynchronizer::new(Arc::clone(&cart), Arc::clone(&gateway));

    let remote = Cart::from_lines(vec![CartLine::from_product(&product(5), 1)]);
    gateway.set_remote("u1", remote.clone());

    // Guest browsing before login.
    cart.add_line(&product(1), 2);

    let identity = observer
        .login("user@example.com", "hunter2")
        .await
        .expect("login succeeds");
    assert_eq!(identity.uid.as_str(), "u1");

    // The transition arrives through the subscription, in provider order.
    let transition = observer.next_transition().await.expect("transition");
    sync.apply(transition).await;

    assert_eq!(cart.snapshot(), remote);
    assert_eq!(sync.phase(), SyncPhase::Authenticated(identity));
    assert!(!observer.is_loading());
}

#[tokio::test]
async fn logout_via_observer_persists_and_clears() {
    let provider = Arc::new(StubProvider::new());
    provider.register("user@example.com", "hunter2", "u1");

    let observer = SessionObserver::new(Arc::clone(&provider), vec![]);
    let storage = Arc::new(LocalStore::in_memory());
    let cart = Arc::new(CartStore::new(Arc::clone(&storage)));
    let gateway = Arc::new(StubGateway::new());
    let sync = CartSynchronizer::new(Arc::clone(&cart), Arc::clone(&gateway));

    observer
        .login("user@example.com", "hunter2")
        .await
        .expect("login succeeds");
    let transition = observer.next_transition().await.expect("signed in");
    sync.apply(transition).await;

    cart.add_line(&product(7), 3);

    observer.logout().await.expect("logout requested");
    // logout() only requests sign-out; the transition is observed async.
    let transition = observer.next_transition().await.expect("signed out");
    sync.apply(transition).await;

    let expected = Cart::from_lines(vec![CartLine::from_product(&product(7), 3)]);
    assert_eq!(gateway.remote_cart("u1"), Some(expected));
    assert!(cart.snapshot().is_empty());
    assert_eq!(observer.identity(), None);
}

#[tokio::test]
async fn failed_login_surfaces_an_error_and_changes_nothing() {
    let provider = Arc::new(StubProvider::new());
    provider.register("user@example.com", "hunter2", "u1");

    let observer = SessionObserver::new(Arc::clone(&provider), vec![]);

    let result = observer.login("user@example.com", "wrong-password").await;
    assert!(matches!(result, Err(ProviderError::InvalidCredentials)));
    assert_eq!(observer.identity(), None);
}
