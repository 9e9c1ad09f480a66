//! Product sync and catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use orgsite_core::{CatalogProduct, PrintfulProductId, SyncOutcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::printful::ProductDetail;
use crate::services::product_sync::{self, SyncOptions};
use crate::state::AppState;

/// Response of `POST /sync-products`.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub products: Vec<SyncOutcome>,
}

/// Response of `GET /sync-products`.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub success: bool,
    pub products: Vec<CatalogProduct>,
}

/// Response of `GET /sync-products/{id}`.
#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub success: bool,
    #[serde(flatten)]
    pub product: ProductDetail,
}

/// Response of `GET /sync-products/price`.
#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub success: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Query for `GET /sync-products/price`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub product_id: Option<String>,
}

/// Mirror the Printful catalog into Stripe.
///
/// # Route
///
/// `POST /sync-products`
///
/// # Errors
///
/// 400 without a Printful key, 500 without a Stripe key or if the catalog
/// cannot be read.
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    let options = SyncOptions {
        concurrency: state.config().sync_concurrency,
    };
    let products = product_sync::sync_all_products(state.printful(), state.stripe(), options).await?;

    Ok(Json(SyncResponse {
        success: true,
        message: product_sync::sync_summary(&products),
        products,
    }))
}

/// List the full catalog.
///
/// # Route
///
/// `GET /sync-products`
///
/// # Errors
///
/// 400 without a Printful key, 500 if any Printful call fails.
pub async fn catalog(State(state): State<AppState>) -> Result<Json<CatalogResponse>> {
    let products = product_sync::get_catalog(state.printful()).await?;
    Ok(Json(CatalogResponse {
        success: true,
        products,
    }))
}

/// Fetch one product with its variants.
///
/// # Route
///
/// `GET /sync-products/{id}`
///
/// # Errors
///
/// 400 for a non-integer id or a missing key, 500 if Printful fails.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetailResponse>> {
    let id = parse_product_id(&id)?;
    let product = product_sync::get_product_detail(state.printful(), id).await?;
    Ok(Json(DetailResponse {
        success: true,
        product,
    }))
}

/// Resolve a product's retail price.
///
/// # Route
///
/// `GET /sync-products/price?productId=`
///
/// # Errors
///
/// 400 for a missing or invalid id, 500 when Printful has no price.
pub async fn price(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceResponse>> {
    let raw = query
        .product_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("productId is required".to_string()))?;
    let id = parse_product_id(&raw)?;

    let price = product_sync::get_retail_price(state.printful(), id).await?;
    Ok(Json(PriceResponse {
        success: true,
        price,
    }))
}

fn parse_product_id(raw: &str) -> Result<PrintfulProductId> {
    raw.parse::<PrintfulProductId>()
        .map_err(|_| AppError::Validation(format!("Invalid product id: {raw}")))
}
