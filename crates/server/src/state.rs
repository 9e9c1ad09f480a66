//! Application state shared across handlers.

use std::sync::Arc;

use url::Url;

use crate::config::SiteConfig;
use crate::printful::PrintfulClient;
use crate::spotify::SpotifyClient;
use crate::stripe::StripeClient;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("invalid SITE_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. All provider clients share one connection
/// pool with the configured upstream timeout.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    stripe: StripeClient,
    printful: PrintfulClient,
    spotify: SpotifyClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the public
    /// base URL is not a valid URL.
    pub fn new(config: SiteConfig) -> Result<Self, StateError> {
        if let Some(base_url) = &config.base_url {
            Url::parse(base_url)?;
        }

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .user_agent(concat!("orgsite-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let stripe = StripeClient::new(&config.stripe, http.clone());
        let printful = PrintfulClient::new(&config.printful, http.clone());
        let spotify = SpotifyClient::new(&config.spotify, http);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stripe,
                printful,
                spotify,
            }),
        })
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the Stripe client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the Printful client.
    #[must_use]
    pub fn printful(&self) -> &PrintfulClient {
        &self.inner.printful
    }

    /// Get a reference to the Spotify client.
    #[must_use]
    pub fn spotify(&self) -> &SpotifyClient {
        &self.inner.spotify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::config_with_upstream;

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = config_with_upstream("http://127.0.0.1:9");
        config.base_url = Some("not a url".to_string());
        assert!(matches!(
            AppState::new(config),
            Err(StateError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_clients_share_configuration() {
        let mut config = config_with_upstream("http://127.0.0.1:9");
        config.printful.api_key = None;
        let state = AppState::new(config).unwrap_or_else(|e| panic!("{e}"));

        assert!(state.stripe().is_configured());
        assert!(!state.printful().is_configured());
        assert!(state.spotify().is_configured());
    }
}
