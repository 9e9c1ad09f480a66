//! Stripe API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the REST API, authenticated with the
//!   secret key as a bearer token
//! - Request bodies use Stripe's bracketed form encoding
//!   (`line_items[0][price_data][unit_amount]=1999`), built by [`form`]
//! - The client is constructed explicitly from configuration and handed to
//!   the orchestrators; tests point `api_base` at a fake server
//!
//! # APIs
//!
//! - Checkout Sessions: hosted payment page for a cart
//! - Products / Prices: catalog mirrored from Printful, keyed by metadata

mod client;
pub mod form;
pub mod types;

pub use client::StripeClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// No secret key is configured.
    #[error("Stripe secret key is not configured")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request value could not be represented (e.g. price out of range).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_error_display() {
        let err = StripeError::Api {
            status: 402,
            message: "Your card was declined.".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 402 - Your card was declined.");
        assert_eq!(
            StripeError::MissingApiKey.to_string(),
            "Stripe secret key is not configured"
        );
    }
}
