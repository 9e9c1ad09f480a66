//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as a JSON body
//! `{"error": "...", "details": ...}`; server faults are logged and captured
//! to Sentry before responding. Upstream error text stays server-side.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use orgsite_core::{CartError, PrintfulProductId};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::MissingConfig;
use crate::printful::PrintfulError;
use crate::spotify::SpotifyError;
use crate::stripe::StripeError;

/// A failed call to one of the third-party providers.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Stripe: {0}")]
    Stripe(#[from] StripeError),

    #[error("Printful: {0}")]
    Printful(#[from] PrintfulError),

    #[error("Spotify: {0}")]
    Spotify(#[from] SpotifyError),
}

impl UpstreamError {
    const fn provider(&self) -> &'static str {
        match self {
            Self::Stripe(_) => "stripe",
            Self::Printful(_) => "printful",
            Self::Spotify(_) => "spotify",
        }
    }

    /// The configuration gap behind this error, if it never left the server.
    const fn missing_config(&self) -> Option<MissingConfig> {
        match self {
            Self::Stripe(StripeError::MissingApiKey) => Some(MissingConfig::StripeSecretKey),
            Self::Printful(PrintfulError::MissingApiKey) => Some(MissingConfig::PrintfulApiKey),
            Self::Spotify(SpotifyError::NotConfigured(missing)) => Some(*missing),
            _ => None,
        }
    }
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller input is malformed or missing.
    #[error("{0}")]
    Validation(String),

    /// A required setting is absent.
    #[error("{0}")]
    Configuration(#[from] MissingConfig),

    /// A provider call failed.
    #[error("{operation} failed: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: UpstreamError,
    },

    /// Printful has no usable retail price for the product.
    #[error("No retail price available for product {0}")]
    PriceUnavailable(PrintfulProductId),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Wrap a provider error raised while performing `operation`.
    ///
    /// Missing-credential errors become [`AppError::Configuration`] so they
    /// keep their configured status code.
    pub fn upstream(operation: &'static str, err: impl Into<UpstreamError>) -> Self {
        let source = err.into();
        match source.missing_config() {
            Some(missing) => Self::Configuration(missing),
            None => Self::Upstream { operation, source },
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(missing) => missing.status(),
            Self::Upstream { .. } | Self::PriceUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Upstream { operation, source } => json!({
                "error": "Upstream service request failed",
                "details": { "operation": operation, "provider": source.provider() },
            }),
            Self::PriceUnavailable(id) => json!({
                "error": self.to_string(),
                "details": { "productId": id },
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
