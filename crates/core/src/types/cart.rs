//! Shopping cart data model.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s with at most one line per
//! product. Insertion order is stable so list views diff cleanly. The same
//! JSON shape is used everywhere a cart travels: the durable local keys, the
//! remote `carts` record, and order line items.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::records::Product;

/// A single cart line: one product at some quantity.
///
/// Invariant: `qty >= 1`. A line whose quantity is reduced to zero is removed
/// from the cart rather than retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to.
    pub id: ProductId,
    /// Display name, denormalized so the cart renders without a catalog fetch.
    pub name: String,
    /// Unit price in minor units at the time the line was added.
    pub price: Price,
    /// Product image URL.
    pub image: String,
    /// Quantity, always at least 1.
    pub qty: u32,
}

impl CartLine {
    /// Build a line from a catalog product.
    #[must_use]
    pub fn from_product(product: &Product, qty: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            qty,
        }
    }

    /// Line subtotal (`price * qty`).
    #[must_use]
    pub const fn line_total(&self) -> Price {
        self.price.saturating_mul(self.qty)
    }
}

/// An ordered collection of cart lines.
///
/// Serializes transparently as a JSON array of lines. Deserialization routes
/// through [`Cart::from_lines`], so duplicate or zero-quantity lines in
/// stored or wire data are repaired rather than admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let lines = Vec::<CartLine>::deserialize(deserializer)?;
        Ok(Self::from_lines(lines))
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from existing lines, merging duplicates and dropping
    /// zero-quantity lines so the per-product uniqueness invariant holds even
    /// for data read back from storage.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line);
        }
        cart
    }

    /// Add a line, merging with an existing line for the same product.
    ///
    /// If a line with the same product id exists its quantity is incremented;
    /// otherwise the line is appended. A zero-quantity line is ignored.
    pub fn add(&mut self, line: CartLine) {
        if line.qty == 0 {
            return;
        }
        if let Some(existing) = self.lines.iter_mut().find(|l| l.id == line.id) {
            existing.qty = existing.qty.saturating_add(line.qty);
        } else {
            self.lines.push(line);
        }
    }

    /// Remove the line for `id` if present; no-op otherwise.
    pub fn remove(&mut self, id: ProductId) {
        self.lines.retain(|l| l.id != id);
    }

    /// Set the quantity of the line for `id` directly.
    ///
    /// Setting a quantity of zero removes the line (the UI is expected to
    /// prevent this, but the cart tolerates it rather than keeping a
    /// zero-quantity line around). Unknown ids are ignored.
    pub fn set_qty(&mut self, id: ProductId, qty: u32) {
        if qty == 0 {
            self.remove(id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.id == id) {
            line.qty = qty;
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total item count across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().fold(0, |acc, l| acc.saturating_add(l.qty))
    }

    /// Cart total in minor units.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines
            .iter()
            .fold(Price::ZERO, |acc, l| acc.saturating_add(l.line_total()))
    }

    /// Iterate the lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = core::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
