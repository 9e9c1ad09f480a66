//! Printful print-on-demand API client.
//!
//! Read-only access to the store's synced products. Printful is the source
//! of truth for what the site sells and at what retail price; the product
//! sync mirrors it into Stripe.
//!
//! # Endpoints used
//!
//! - `GET /store/products` - paginated product summaries
//! - `GET /store/products/{id}` - product with its sync variants and prices

mod client;
pub mod types;

pub use client::PrintfulClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// No API key is configured.
    #[error("Printful API key is not configured")]
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printful_error_display() {
        let err = PrintfulError::Api {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");
    }
}
