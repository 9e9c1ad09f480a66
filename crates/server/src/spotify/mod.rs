//! Spotify OAuth relay and Web API client.
//!
//! The server never stores Spotify tokens. It holds the app credentials and
//! relays the browser through the authorization-code flow, refreshes tokens
//! on request, and mints app-only tokens for public playlist reads.
//!
//! # Endpoints used
//!
//! - `GET {accounts}/authorize` - user consent page (redirect target only)
//! - `POST {accounts}/api/token` - all grants, HTTP Basic client auth
//! - `GET {api}/playlists/{id}` - playlist metadata and tracks

mod client;
pub mod types;

pub use client::{SCOPES, SpotifyClient};

use thiserror::Error;

use crate::config::MissingConfig;

/// Errors that can occur when interacting with Spotify.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// A credential or the redirect URI is not configured.
    #[error(transparent)]
    NotConfigured(#[from] MissingConfig),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Spotify returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}
