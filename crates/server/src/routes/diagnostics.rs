//! Diagnostic endpoints for exercising timeout monitoring.
//!
//! `/diagnostics/slow` outlasts the 10 second watchdog threshold of the
//! hosting platform; `/diagnostics/hang` never completes at all.

use std::time::Duration;

use axum::Json;
use serde_json::{Value, json};
use tracing::{info, instrument};

/// How long `/diagnostics/slow` waits before responding.
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_secs(12);

/// Respond after exactly [`SLOW_RESPONSE_DELAY`].
#[instrument]
pub async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
    info!("Slow diagnostic response sent");

    Json(json!({
        "success": true,
        "delayMs": SLOW_RESPONSE_DELAY.as_millis(),
    }))
}

/// Never respond.
#[instrument]
pub async fn hang() -> Json<Value> {
    info!("Hanging diagnostic request");
    std::future::pending().await
}
