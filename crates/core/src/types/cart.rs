//! Cart and checkout request types.
//!
//! A checkout request is the browser's cart serialized as JSON:
//!
//! ```json
//! {
//!   "items": [
//!     { "id": "tee-m", "name": "Club Tee", "price": 19.99, "image": "https://…",
//!       "quantity": 2, "stripePriceId": "price_123" }
//!   ],
//!   "customerEmail": "student@example.edu"
//! }
//! ```
//!
//! [`CheckoutRequest::validate`] enforces the cart invariants before any
//! provider is contacted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::StripePriceId;
use super::price::Price;

/// Errors that can occur when validating a [`CheckoutRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The cart has no line items.
    #[error("cart must contain at least one item")]
    EmptyCart,
    /// The customer email is missing or blank.
    #[error("customer email is required")]
    MissingEmail,
    /// A line item has a quantity of zero.
    #[error("item {0} must have a quantity of at least 1")]
    InvalidQuantity(String),
    /// A line item has a negative price.
    #[error("item {0} has a negative price")]
    NegativePrice(String),
}

/// One entry in the browser's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Site-local product or variant identifier.
    pub id: String,
    /// Display name shown on the hosted checkout page.
    pub name: String,
    /// Unit price in decimal currency units.
    pub price: Decimal,
    /// Product image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Number of units, at least 1.
    pub quantity: u32,
    /// Pre-existing Stripe price for this item, when the product was synced.
    #[serde(default)]
    pub stripe_price_id: Option<StripePriceId>,
}

impl CartLineItem {
    /// Unit price as a USD [`Price`].
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}

/// Body of `POST /checkout`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLineItem>,
    #[serde(default)]
    pub customer_email: String,
}

impl CheckoutRequest {
    /// Validate the cart invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is empty, the email is blank, or any
    /// item has a zero quantity or a negative price.
    pub fn validate(self) -> Result<ValidatedCheckout, CartError> {
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let customer_email = self.customer_email.trim().to_owned();
        if customer_email.is_empty() {
            return Err(CartError::MissingEmail);
        }

        for item in &self.items {
            if item.quantity == 0 {
                return Err(CartError::InvalidQuantity(item.id.clone()));
            }
            if item.price.is_sign_negative() && !item.price.is_zero() {
                return Err(CartError::NegativePrice(item.id.clone()));
            }
        }

        Ok(ValidatedCheckout {
            items: self.items,
            customer_email,
        })
    }
}

/// A checkout request whose invariants have been checked.
///
/// Only obtainable through [`CheckoutRequest::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    items: Vec<CartLineItem>,
    customer_email: String,
}

impl ValidatedCheckout {
    /// Line items in cart order (never empty).
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Customer email (non-empty, trimmed).
    #[must_use]
    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }
}

/// Response of `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    /// Stripe Checkout Session id.
    pub session_id: String,
    /// Hosted checkout page to redirect the browser to.
    pub url: String,
}
