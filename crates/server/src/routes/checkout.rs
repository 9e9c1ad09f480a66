//! Checkout route handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use orgsite_core::{CheckoutRequest, CheckoutResult};

use crate::error::{AppError, Result};
use crate::services::checkout;
use crate::state::AppState;

/// Create a hosted Checkout Session for the posted cart.
///
/// # Route
///
/// `POST /checkout`
///
/// # Errors
///
/// 400 for an invalid cart, 500 for missing configuration or a Stripe failure.
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResult>> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let result = checkout::create_checkout_session(state.stripe(), state.config(), request).await?;
    Ok(Json(result))
}
