//! Print-on-demand catalog types and product sync outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{PrintfulProductId, PrintfulVariantId, StripePriceId, StripeProductId};

/// A sellable product from the Printful store, with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: PrintfulProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Retail price of the product, taken from its first priced variant.
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub price: Option<Decimal>,
    pub image: Option<String>,
    #[serde(default)]
    pub variants: Vec<CatalogVariant>,
}

/// A specific color/size combination of a [`CatalogProduct`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVariant {
    pub id: PrintfulVariantId,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub price: Option<Decimal>,
    /// Stripe product mirrored from this variant, if known.
    #[serde(default)]
    pub stripe_product_id: Option<StripeProductId>,
    /// Stripe price checkout can reference directly, if known.
    #[serde(default)]
    pub stripe_price_id: Option<StripePriceId>,
}

impl CatalogProduct {
    /// Display name for a variant's own Stripe product.
    #[must_use]
    pub fn variant_display_name(&self, variant: &CatalogVariant) -> String {
        match (&variant.color, &variant.size) {
            (Some(color), Some(size)) => format!("{} - {color} / {size}", self.name),
            (Some(only), None) | (None, Some(only)) => format!("{} - {only}", self.name),
            (None, None) => variant.name.clone(),
        }
    }
}

/// How one variant was mapped into the Stripe catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMapping {
    pub printful_variant_id: PrintfulVariantId,
    pub stripe_product_id: StripeProductId,
    pub stripe_price_id: StripePriceId,
}

/// Per-product record produced by one sync invocation.
///
/// A failed product carries `error` and no Stripe ids; the remaining
/// products in the same run are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub printful_id: PrintfulProductId,
    pub name: String,
    pub stripe_product_id: Option<StripeProductId>,
    pub stripe_price_id: Option<StripePriceId>,
    #[serde(default)]
    pub variants: Vec<VariantMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    /// Outcome for a product that could not be synced.
    #[must_use]
    pub fn failed(printful_id: PrintfulProductId, name: impl Into<String>, error: String) -> Self {
        Self {
            printful_id,
            name: name.into(),
            stripe_product_id: None,
            stripe_price_id: None,
            variants: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether the product was mirrored without error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
