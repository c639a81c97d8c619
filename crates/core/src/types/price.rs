//! Type-safe price representation in integer minor units.
//!
//! Prices are stored as whole numbers of the currency's smallest unit (kobo
//! for NGN, cents for USD). Integer arithmetic sidesteps float rounding in
//! cart totals; formatting only happens at the display edge.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A monetary amount in integer minor units.
///
/// Serializes transparently as the raw integer, which is also the wire format
/// used by the cart and order records.
///
/// # Examples
///
/// ```
/// use mirabel_core::Price;
///
/// let bottle = Price::from_minor(1_250_000); // ₦12,500.00
/// assert_eq!(bottle.as_minor(), 1_250_000);
/// assert_eq!(bottle.display(), "₦12,500.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price from minor units (kobo, cents).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Get the amount in minor units.
    #[must_use]
    pub const fn as_minor(&self) -> i64 {
        self.0
    }

    /// Saturating addition, used when summing cart lines.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating multiplication by a quantity.
    #[must_use]
    pub const fn saturating_mul(self, qty: u32) -> Self {
        Self(self.0.saturating_mul(qty as i64))
    }

    /// Format for display in the default currency.
    #[must_use]
    pub fn display(&self) -> String {
        self.display_in(Currency::default())
    }

    /// Format for display in the given currency (e.g. `₦12,500.00`).
    #[must_use]
    pub fn display_in(&self, currency: Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = group_thousands(abs / 100);
        let minor = abs % 100;
        format!("{sign}{}{major}.{minor:02}", currency.symbol())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// ISO 4217 currencies the shop prices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// Nigerian naira (the shop's home currency).
    #[default]
    NGN,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// The display symbol for this currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

/// Insert `,` separators into a whole number.
fn group_thousands(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut groups = Vec::new();
    while n > 0 {
        groups.push(n % 1000);
        n /= 1000;
    }
    let mut out = String::new();
    for (i, group) in groups.iter().rev().enumerate() {
        if i == 0 {
            out.push_str(&group.to_string());
        } else {
            out.push_str(&format!(",{group:03}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Price::from_minor(0).display(), "₦0.00");
        assert_eq!(Price::from_minor(999).display(), "₦9.99");
        assert_eq!(Price::from_minor(1_250_000).display(), "₦12,500.00");
        assert_eq!(Price::from_minor(123_456_789_00).display(), "₦123,456,789.00");
    }

    #[test]
    fn display_negative_amounts() {
        assert_eq!(Price::from_minor(-150).display(), "-₦1.50");
    }

    #[test]
    fn display_in_other_currencies() {
        assert_eq!(Price::from_minor(1999).display_in(Currency::USD), "$19.99");
        assert_eq!(Price::from_minor(500).display_in(Currency::GBP), "£5.00");
    }

    #[test]
    fn saturating_math() {
        let p = Price::from_minor(i64::MAX);
        assert_eq!(p.saturating_add(Price::from_minor(1)), p);
        assert_eq!(Price::from_minor(200).saturating_mul(3).as_minor(), 600);
    }

    #[test]
    fn serde_is_transparent() {
        let p = Price::from_minor(4200);
        assert_eq!(serde_json::to_string(&p).expect("serialize"), "4200");
        let back: Price = serde_json::from_str("4200").expect("deserialize");
        assert_eq!(back, p);
    }
}
