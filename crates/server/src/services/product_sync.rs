//! Printful catalog reads and the Printful to Stripe product mirror.
//!
//! Printful owns the catalog and its retail prices. A sync run mirrors every
//! store product, and each of its variants, into a Stripe product carrying
//! an active price, keyed by Printful ids stored in Stripe metadata:
//!
//! - `metadata['printful_product_id']` on the product-level Stripe product
//! - `metadata['printful_variant_id']` on each variant's Stripe product, which
//!   also names its store product under `printful_parent_product_id`
//!
//! Runs are best-effort: a product that fails is reported with its error
//! and the rest of the catalog still syncs.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use orgsite_core::{
    CatalogProduct, CatalogVariant, Price, PriceError, PrintfulProductId, StripePriceId,
    SyncOutcome, VariantMapping,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::MissingConfig;
use crate::error::{AppError, Result};
use crate::printful::{PrintfulClient, ProductDetail};
use crate::stripe::{PriceParams, Product, ProductParams, StripeClient, StripeError};

/// Stripe metadata key linking a product to its Printful store product.
pub const PRODUCT_METADATA_KEY: &str = "printful_product_id";

/// Stripe metadata key linking a product to its Printful sync variant.
pub const VARIANT_METADATA_KEY: &str = "printful_variant_id";

/// Stripe metadata key naming the store product a variant belongs to.
///
/// Distinct from [`PRODUCT_METADATA_KEY`] so product searches never match
/// variant products.
pub const PARENT_METADATA_KEY: &str = "printful_parent_product_id";

/// Knobs for a sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Products mirrored in parallel; 1 means strictly sequential.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Why a single product failed to sync.
#[derive(Debug, Error)]
enum ProductSyncError {
    #[error("no retail price available")]
    PriceUnavailable,

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Stripe(#[from] StripeError),
}

// =============================================================================
// Catalog reads
// =============================================================================

/// Fetch the full catalog: every store product with its variants.
///
/// Details are fetched one product at a time in listing order. Any failure
/// fails the whole call; no partial catalog is returned.
///
/// # Errors
///
/// Returns [`AppError::Configuration`] without a call if the Printful key is
/// unset, or [`AppError::Upstream`] if any request fails.
#[instrument(skip_all)]
pub async fn get_catalog(printful: &PrintfulClient) -> Result<Vec<CatalogProduct>> {
    if !printful.is_configured() {
        return Err(MissingConfig::PrintfulApiKey.into());
    }

    let summaries = printful
        .list_store_products()
        .await
        .map_err(|e| AppError::upstream("list_products", e))?;

    let mut catalog = Vec::with_capacity(summaries.len());
    for summary in summaries.iter().filter(|s| !s.is_ignored) {
        let detail = printful
            .get_store_product(summary.id)
            .await
            .map_err(|e| AppError::upstream("get_product", e))?;
        catalog.push(CatalogProduct::from(detail));
    }

    debug!(count = catalog.len(), "Fetched catalog");
    Ok(catalog)
}

/// Fetch one store product with its sync variants.
///
/// # Errors
///
/// Returns [`AppError::Configuration`] if the Printful key is unset, or
/// [`AppError::Upstream`] if the request fails.
#[instrument(skip(printful))]
pub async fn get_product_detail(
    printful: &PrintfulClient,
    id: PrintfulProductId,
) -> Result<ProductDetail> {
    if !printful.is_configured() {
        return Err(MissingConfig::PrintfulApiKey.into());
    }

    printful
        .get_store_product(id)
        .await
        .map_err(|e| AppError::upstream("get_product", e))
}

/// Resolve a product's retail price from its first priced variant.
///
/// # Errors
///
/// Returns [`AppError::PriceUnavailable`] when no variant carries a usable
/// price, never a zero price.
#[instrument(skip(printful))]
pub async fn get_retail_price(printful: &PrintfulClient, id: PrintfulProductId) -> Result<Decimal> {
    let detail = get_product_detail(printful, id).await?;
    detail.retail_price().ok_or_else(|| {
        warn!(product_id = %id, "Printful returned no retail price");
        AppError::PriceUnavailable(id)
    })
}

// =============================================================================
// Stripe mirror
// =============================================================================

/// Mirror the whole Printful catalog into Stripe.
///
/// Returns one outcome per catalog product, in catalog order.
///
/// # Errors
///
/// Returns [`AppError::Configuration`] before any call if either provider
/// key is unset, or [`AppError::Upstream`] if the catalog cannot be fetched.
/// Per-product failures are reported inside the outcomes instead.
#[instrument(skip_all, fields(concurrency = options.concurrency))]
pub async fn sync_all_products(
    printful: &PrintfulClient,
    stripe: &StripeClient,
    options: SyncOptions,
) -> Result<Vec<SyncOutcome>> {
    if !printful.is_configured() {
        return Err(MissingConfig::PrintfulApiKey.into());
    }
    if !stripe.is_configured() {
        return Err(MissingConfig::StripeSecretKey.into());
    }

    let catalog = get_catalog(printful).await?;

    let outcomes: Vec<SyncOutcome> = stream::iter(catalog)
        .map(|product| sync_product(stripe, product))
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    info!(
        synced = outcomes.iter().filter(|o| o.is_success()).count(),
        total = outcomes.len(),
        "Product sync finished"
    );
    Ok(outcomes)
}

/// Human-readable summary of a sync run.
#[must_use]
pub fn sync_summary(outcomes: &[SyncOutcome]) -> String {
    let ok = outcomes.iter().filter(|o| o.is_success()).count();
    format!("Synced {ok} of {} products", outcomes.len())
}

async fn sync_product(stripe: &StripeClient, product: CatalogProduct) -> SyncOutcome {
    match try_sync_product(stripe, &product).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(printful_id = %product.id, error = %e, "Product sync failed");
            SyncOutcome::failed(product.id, product.name, e.to_string())
        }
    }
}

#[instrument(skip_all, fields(printful_id = %product.id))]
async fn try_sync_product(
    stripe: &StripeClient,
    product: &CatalogProduct,
) -> std::result::Result<SyncOutcome, ProductSyncError> {
    let amount = product.price.ok_or(ProductSyncError::PriceUnavailable)?;
    let key_value = product.id.to_string();

    let stripe_product = ensure_product(
        stripe,
        PRODUCT_METADATA_KEY,
        &key_value,
        &product_params(product),
    )
    .await?;
    let price_id = ensure_price(stripe, &stripe_product, PRODUCT_METADATA_KEY, &key_value, amount)
        .await?;

    let mut variants = Vec::with_capacity(product.variants.len());
    for variant in &product.variants {
        let Some(amount) = variant.price.or(product.price) else {
            continue;
        };
        let key_value = variant.id.to_string();

        let variant_product = ensure_product(
            stripe,
            VARIANT_METADATA_KEY,
            &key_value,
            &variant_params(product, variant),
        )
        .await?;
        let variant_price =
            ensure_price(stripe, &variant_product, VARIANT_METADATA_KEY, &key_value, amount)
                .await?;

        variants.push(VariantMapping {
            printful_variant_id: variant.id,
            stripe_product_id: variant_product.id,
            stripe_price_id: variant_price,
        });
    }

    debug!(stripe_product_id = %stripe_product.id, variants = variants.len(), "Product synced");

    Ok(SyncOutcome {
        printful_id: product.id,
        name: product.name.clone(),
        stripe_product_id: Some(stripe_product.id),
        stripe_price_id: Some(price_id),
        variants,
        error: None,
    })
}

fn product_params(product: &CatalogProduct) -> ProductParams {
    ProductParams {
        name: product.name.clone(),
        description: Some(product.description.clone()),
        images: product.image.iter().cloned().collect(),
        metadata: BTreeMap::from([(PRODUCT_METADATA_KEY.to_string(), product.id.to_string())]),
    }
}

fn variant_params(product: &CatalogProduct, variant: &CatalogVariant) -> ProductParams {
    ProductParams {
        name: product.variant_display_name(variant),
        description: Some(product.description.clone()),
        images: product.image.iter().cloned().collect(),
        metadata: BTreeMap::from([
            (PARENT_METADATA_KEY.to_string(), product.id.to_string()),
            (VARIANT_METADATA_KEY.to_string(), variant.id.to_string()),
        ]),
    }
}

/// Update the Stripe product tagged `key=value`, or create it.
async fn ensure_product(
    stripe: &StripeClient,
    key: &str,
    value: &str,
    params: &ProductParams,
) -> std::result::Result<Product, StripeError> {
    match stripe.find_product_by_metadata(key, value).await? {
        Some(existing) => stripe.update_product(&existing.id, params).await,
        None => stripe.create_product(params).await,
    }
}

/// Make sure `product` has an active USD price of `amount`.
///
/// An existing matching price is reused. Otherwise a new one is created and
/// the product's other active prices tagged `key=value` are archived.
async fn ensure_price(
    stripe: &StripeClient,
    product: &Product,
    key: &str,
    value: &str,
    amount: Decimal,
) -> std::result::Result<StripePriceId, ProductSyncError> {
    let price = Price::usd(amount);
    let unit_amount = price.to_minor_units()?;
    let active = stripe.list_active_prices(&product.id).await?;

    if let Some(existing) = active
        .iter()
        .find(|p| p.matches(price.currency_code, unit_amount))
    {
        return Ok(existing.id.clone());
    }

    let created = stripe
        .create_price(&PriceParams {
            product: product.id.clone(),
            currency: price.currency_code,
            unit_amount,
            metadata: BTreeMap::from([(key.to_string(), value.to_string())]),
        })
        .await?;

    for stale in active
        .iter()
        .filter(|p| p.metadata.get(key).map(String::as_str) == Some(value))
    {
        debug!(price_id = %stale.id, "Archiving stale price");
        stripe.deactivate_price(&stale.id).await?;
    }

    Ok(created.id)
}
