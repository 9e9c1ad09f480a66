//! Stripe request and response types.
//!
//! Request types render themselves with [`FormBuilder`]; response types only
//! carry the fields this server reads.

use std::collections::{BTreeMap, HashMap};

use orgsite_core::{CurrencyCode, StripePriceId, StripeProductId};
use serde::Deserialize;

use super::form::{FormBuilder, FormPairs};

// =============================================================================
// Checkout Sessions
// =============================================================================

/// Checkout Session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
}

impl CheckoutMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
        }
    }
}

/// How a line item is priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemPrice {
    /// Reference to a price already in the Stripe catalog.
    Existing(StripePriceId),
    /// Ad-hoc price described inline.
    Inline(PriceData),
}

/// Inline price descriptor (`price_data`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceData {
    pub currency: CurrencyCode,
    /// Amount in minor units.
    pub unit_amount: i64,
    pub product_name: String,
    pub product_images: Vec<String>,
}

/// One entry of `line_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub price: LineItemPrice,
    pub quantity: u32,
}

impl SessionLineItem {
    fn to_form(&self) -> FormPairs {
        let mut form = FormBuilder::new();
        match &self.price {
            LineItemPrice::Existing(price) => {
                form.push("price", price);
            }
            LineItemPrice::Inline(data) => {
                form.push("price_data[currency]", data.currency.as_stripe_str());
                form.push("price_data[unit_amount]", data.unit_amount);
                form.push("price_data[product_data][name]", &data.product_name);
                form.push_list("price_data[product_data][images]", &data.product_images);
            }
        }
        form.push("quantity", self.quantity);
        form.build()
    }
}

/// Parameters for `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub payment_method_types: Vec<&'static str>,
    pub line_items: Vec<SessionLineItem>,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub billing_address_required: bool,
    pub allowed_shipping_countries: Vec<&'static str>,
    pub always_create_customer: bool,
    pub collect_phone_number: bool,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionRequest {
    /// Encode as Stripe form pairs.
    #[must_use]
    pub fn to_form(&self) -> FormPairs {
        let mut form = FormBuilder::new();
        form.push_list("payment_method_types", &self.payment_method_types);
        for (i, item) in self.line_items.iter().enumerate() {
            form.push_nested(&format!("line_items[{i}]"), item.to_form());
        }
        form.push("mode", self.mode.as_str());
        form.push("success_url", &self.success_url);
        form.push("cancel_url", &self.cancel_url);
        form.push("customer_email", &self.customer_email);
        if self.billing_address_required {
            form.push("billing_address_collection", "required");
        }
        form.push_list(
            "shipping_address_collection[allowed_countries]",
            &self.allowed_shipping_countries,
        );
        if self.always_create_customer {
            form.push("customer_creation", "always");
        }
        form.push("phone_number_collection[enabled]", self.collect_phone_number);
        form.push_map("metadata", &self.metadata);
        form.build()
    }
}

/// A created Checkout Session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page URL; only absent for embedded sessions.
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Products & Prices
// =============================================================================

/// Parameters for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductParams {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ProductParams {
    /// Encode as Stripe form pairs.
    #[must_use]
    pub fn to_form(&self) -> FormPairs {
        let mut form = FormBuilder::new();
        form.push("name", &self.name);
        // Stripe rejects an empty description string.
        form.push_opt(
            "description",
            self.description.as_deref().filter(|d| !d.is_empty()),
        );
        form.push_list("images", &self.images);
        form.push_map("metadata", &self.metadata);
        form.build()
    }
}

/// Parameters for creating a price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceParams {
    pub product: StripeProductId,
    pub currency: CurrencyCode,
    pub unit_amount: i64,
    pub metadata: BTreeMap<String, String>,
}

impl PriceParams {
    /// Encode as Stripe form pairs.
    #[must_use]
    pub fn to_form(&self) -> FormPairs {
        let mut form = FormBuilder::new();
        form.push("product", &self.product);
        form.push("currency", self.currency.as_stripe_str());
        form.push("unit_amount", self.unit_amount);
        form.push_map("metadata", &self.metadata);
        form.build()
    }
}

/// A Stripe product.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: StripeProductId,
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A Stripe price.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: StripePriceId,
    #[serde(default)]
    pub active: bool,
    pub currency: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Price {
    /// Whether this price charges `unit_amount` in `currency`.
    #[must_use]
    pub fn matches(&self, currency: CurrencyCode, unit_amount: i64) -> bool {
        self.active
            && self.unit_amount == Some(unit_amount)
            && self.currency.eq_ignore_ascii_case(currency.as_stripe_str())
    }
}

/// List and search envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Error envelope (`{"error": {"message": ..., "type": ...}}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}
