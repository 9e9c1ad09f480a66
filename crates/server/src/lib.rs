//! Student-organization site integration server.
//!
//! Stateless JSON API sitting between the site's frontend and three
//! providers:
//!
//! - **Stripe** - hosted Checkout Sessions for the cart, and the product and
//!   price catalog mirrored from Printful
//! - **Printful** - print-on-demand store products and retail prices
//! - **Spotify** - OAuth token relay and public playlist reads
//!
//! Plus two diagnostic endpoints for the hosting platform's timeout
//! monitoring. Nothing is persisted; every request is served from
//! configuration and live provider calls.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod printful;
pub mod routes;
pub mod services;
pub mod spotify;
pub mod state;
pub mod stripe;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

pub use config::SiteConfig;
pub use state::AppState;

/// Build the application router with its full middleware stack.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
