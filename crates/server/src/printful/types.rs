//! Printful API response types and their conversion into catalog types.

use orgsite_core::{CatalogProduct, CatalogVariant, Price, PrintfulProductId, PrintfulVariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response envelope (`{"code": 200, "result": ..., "paging": ...}`).
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// Pagination info on list responses.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Paging {
    pub total: usize,
    pub offset: usize,
}

/// Error envelope (`{"code": 404, "error": {"reason": ..., "message": ...}}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Summary of a store product as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProduct {
    pub id: PrintfulProductId,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub variants: u32,
    #[serde(default)]
    pub synced: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
}

/// Blank catalog product a sync variant is printed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantBaseProduct {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Print file attached to a sync variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFile {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// A sellable variant of a store product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncVariant {
    pub id: PrintfulVariantId,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    /// Retail price as a decimal string, e.g. `"25.00"`.
    #[serde(default)]
    pub retail_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_ignored: bool,
    #[serde(default)]
    pub product: Option<VariantBaseProduct>,
    #[serde(default)]
    pub files: Vec<VariantFile>,
}

impl SyncVariant {
    /// Parsed retail price, if Printful supplied a usable one.
    #[must_use]
    pub fn retail_price(&self) -> Option<Decimal> {
        self.retail_price
            .as_deref()
            .and_then(|p| Price::parse_amount(p).ok())
    }

    /// Best image for this variant: the mockup preview, else the blank.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.files
            .iter()
            .filter(|f| f.kind.as_deref() == Some("preview"))
            .chain(self.files.iter())
            .find_map(|f| f.preview_url.as_deref())
            .or_else(|| self.product.as_ref().and_then(|p| p.image.as_deref()))
    }
}

/// Full product detail (`GET /store/products/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub sync_product: SyncProduct,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

impl ProductDetail {
    /// Retail price of the product: the first variant with a parseable price.
    #[must_use]
    pub fn retail_price(&self) -> Option<Decimal> {
        self.sync_variants.iter().find_map(SyncVariant::retail_price)
    }
}

impl From<ProductDetail> for CatalogProduct {
    fn from(detail: ProductDetail) -> Self {
        let price = detail.retail_price();
        let description = detail
            .sync_variants
            .iter()
            .find_map(|v| v.product.as_ref().and_then(|p| p.name.clone()))
            .unwrap_or_default();

        let image = detail.sync_product.thumbnail_url.clone().or_else(|| {
            detail
                .sync_variants
                .iter()
                .find_map(|v| v.image().map(String::from))
        });

        let variants = detail
            .sync_variants
            .iter()
            .filter(|v| !v.is_ignored)
            .map(|v| CatalogVariant {
                id: v.id,
                name: v.name.clone(),
                color: v.color.clone(),
                size: v.size.clone(),
                price: v.retail_price(),
                stripe_product_id: None,
                stripe_price_id: None,
            })
            .collect();

        Self {
            id: detail.sync_product.id,
            name: detail.sync_product.name,
            description,
            price,
            image,
            variants,
        }
    }
}
