//! Health check endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Which integrations have their credentials configured.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrations {
    pub stripe: bool,
    pub printful: bool,
    pub spotify: bool,
    pub base_url: bool,
}

/// Readiness response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub status: &'static str,
    pub integrations: Integrations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_publishable_key: Option<String>,
}

/// Readiness health check endpoint.
///
/// There is no database to probe, so this always reports ready. The body
/// lists which integrations will work, since missing keys only surface per
/// request.
pub async fn readiness(State(state): State<AppState>) -> Json<Readiness> {
    let config = state.config();

    Json(Readiness {
        status: "ready",
        integrations: Integrations {
            stripe: state.stripe().is_configured(),
            printful: state.printful().is_configured(),
            spotify: state.spotify().is_configured(),
            base_url: config.base_url.is_some(),
        },
        stripe_publishable_key: config.stripe.publishable_key.clone(),
    })
}
