//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness and configured integrations
//!
//! # Checkout
//! POST /checkout                   - Create a Stripe Checkout Session
//!
//! # Product sync
//! POST /sync-products              - Mirror the Printful catalog into Stripe
//! GET  /sync-products              - Full Printful catalog
//! GET  /sync-products/price        - Retail price (?productId=)
//! GET  /sync-products/{id}         - One product with its variants
//!
//! # Spotify
//! GET  /spotify/auth               - Consent page URL as `{authUrl}`
//! GET  /spotify/callback           - Code exchange, always redirects
//! POST /spotify/client-credentials - App-only token
//! POST /spotify/refresh            - Refresh a user token
//! GET  /spotify/playlist/{id}      - Playlist passthrough
//!
//! # Diagnostics
//! GET  /diagnostics/slow           - Responds after 12 seconds
//! GET  /diagnostics/hang           - Never responds
//! ```

pub mod checkout;
pub mod diagnostics;
pub mod health;
pub mod spotify;
pub mod sync_products;

use axum::{
    Router,
    http::Uri,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the product sync routes router.
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sync_products::catalog).post(sync_products::sync))
        .route("/price", get(sync_products::price))
        .route("/{id}", get(sync_products::detail))
}

/// Create the Spotify routes router.
pub fn spotify_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(spotify::auth))
        .route("/callback", get(spotify::callback))
        .route("/client-credentials", post(spotify::client_credentials))
        .route("/refresh", post(spotify::refresh))
        .route("/playlist/{id}", get(spotify::playlist))
}

/// Create the diagnostics routes router.
pub fn diagnostics_routes() -> Router<AppState> {
    Router::new()
        .route("/slow", get(diagnostics::slow))
        .route("/hang", get(diagnostics::hang))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/checkout", post(checkout::create))
        .nest("/sync-products", sync_routes())
        .nest("/spotify", spotify_routes())
        .nest("/diagnostics", diagnostics_routes())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
