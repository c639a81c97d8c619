//! Checkout: turn the working cart into an order.
//!
//! Payment is a stub - placing an order records it remotely, deletes the
//! per-user remote cart record, and empties the working cart. No payment
//! processor is involved.

use mirabel_core::{Email, EmailError, Identity, Order};

use crate::cart::CartStore;
use crate::gateway::{ApiClient, CartGateway, GatewayError};
use crate::session::provider::TokenSource;
use crate::sync::CartSynchronizer;

/// The checkout form: recipient details collected from the user.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    /// Recipient full name.
    pub name: String,
    /// Contact email.
    pub email: Email,
    /// Shipping address.
    pub address: String,
}

impl CheckoutForm {
    /// Build a form from raw field values, validating the email.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] when the email field is not a valid address.
    pub fn parse(name: &str, email: &str, address: &str) -> Result<Self, EmailError> {
        Ok(Self {
            name: name.trim().to_owned(),
            email: Email::parse(email.trim())?,
            address: address.trim().to_owned(),
        })
    }
}

/// Errors from placing an order.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The working cart is empty; there is nothing to order.
    #[error("the cart is empty")]
    EmptyCart,

    /// The order could not be recorded remotely.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Place an order for the current working cart.
///
/// On success the remote cart record is deleted and the working cart is
/// cleared; the stored order (with its server-assigned id and timestamp) is
/// returned.
///
/// # Errors
///
/// [`CheckoutError::EmptyCart`] when there is nothing to order, or a
/// [`GatewayError`] when the proxy rejects the order. The cart is left
/// untouched on failure so the user can retry.
pub async fn place_order<T, G>(
    api: &ApiClient<T>,
    sync: &CartSynchronizer<G>,
    identity: &Identity,
    form: CheckoutForm,
) -> Result<Order, CheckoutError>
where
    T: TokenSource,
    G: CartGateway,
{
    let cart = sync.cart().snapshot();
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let order = Order {
        id: None,
        user_id: identity.uid.clone(),
        name: form.name,
        email: form.email,
        address: form.address,
        total: cart.total(),
        items: cart.into_lines(),
        created_at: None,
    };

    let placed = api.create_order(&order).await?;
    sync.checkout_completed(identity).await;
    Ok(placed)
}

/// Order summary helpers shared by cart and checkout views.
#[must_use]
pub fn order_summary(cart: &CartStore) -> (u32, String) {
    let snapshot = cart.snapshot();
    (snapshot.item_count(), snapshot.total().display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mirabel_core::{Price, Product, ProductId};

    use crate::storage::LocalStore;

    #[test]
    fn order_summary_reports_count_and_total() {
        let cart = CartStore::new(Arc::new(LocalStore::in_memory()));
        let product = Product {
            id: ProductId::new(1),
            name: "Estate Red".to_owned(),
            price: Price::from_minor(1_500_000),
            image: "https://img.example/red.jpg".to_owned(),
            description: None,
            featured: false,
        };
        cart.add_line(&product, 2);

        let (count, total) = order_summary(&cart);
        assert_eq!(count, 2);
        assert_eq!(total, "₦30,000.00");
    }

    #[test]
    fn form_parse_trims_and_validates() {
        let form = CheckoutForm::parse("  Ada Lovelace ", " ada@example.com ", " 12 Vine St ")
            .expect("valid form");
        assert_eq!(form.name, "Ada Lovelace");
        assert_eq!(form.email.as_str(), "ada@example.com");
        assert_eq!(form.address, "12 Vine St");
    }

    #[test]
    fn form_parse_rejects_bad_email() {
        assert!(CheckoutForm::parse("Ada", "not-an-email", "12 Vine St").is_err());
    }
}
