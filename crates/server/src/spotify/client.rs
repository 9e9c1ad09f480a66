//! Spotify Accounts and Web API client implementation.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use orgsite_core::{AccessToken, OAuthTokenSet};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::SpotifyError;
use super::types::ErrorEnvelope;
use crate::config::{MissingConfig, SpotifyConfig};

/// Scopes requested for the web playback SDK.
pub const SCOPES: &str = "streaming user-read-email user-read-private user-read-playback-state user-modify-playback-state";

/// Client for Spotify's Accounts service and Web API.
#[derive(Clone)]
pub struct SpotifyClient {
    inner: Arc<SpotifyClientInner>,
}

struct SpotifyClientInner {
    client: reqwest::Client,
    accounts_base: String,
    api_base: String,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_uri: Option<String>,
}

impl SpotifyClient {
    /// Create a new Spotify client sharing `client`'s pool and timeout.
    #[must_use]
    pub fn new(config: &SpotifyConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(SpotifyClientInner {
                client,
                accounts_base: config.accounts_base.clone(),
                api_base: config.api_base.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                redirect_uri: config.redirect_uri.clone(),
            }),
        }
    }

    /// Whether both app credentials are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.client_id.is_some() && self.inner.client_secret.is_some()
    }

    /// Build the consent page URL the browser navigates to.
    ///
    /// # Errors
    ///
    /// Returns [`MissingConfig::SpotifyClientId`] or
    /// [`MissingConfig::SpotifyRedirectUri`] when unset, or a parse error if
    /// the accounts base URL is malformed.
    pub fn authorization_url(&self) -> Result<String, SpotifyError> {
        let client_id = self
            .inner
            .client_id
            .as_deref()
            .ok_or(MissingConfig::SpotifyClientId)?;
        let redirect_uri = self.redirect_uri()?;

        let url = Url::parse_with_params(
            &format!("{}/authorize", self.inner.accounts_base),
            &[
                ("response_type", "code"),
                ("client_id", client_id),
                ("scope", SCOPES),
                ("redirect_uri", redirect_uri),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| SpotifyError::Parse(e.to_string()))?;

        Ok(url.into())
    }

    // =========================================================================
    // Token grants
    // =========================================================================

    /// Exchange an authorization code for a token set.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or Spotify rejects the code.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthTokenSet, SpotifyError> {
        let redirect_uri = self.redirect_uri()?;
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or Spotify rejects the token.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, SpotifyError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Obtain an app-only token (no user context).
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the grant fails.
    #[instrument(skip_all)]
    pub async fn client_credentials(&self) -> Result<AccessToken, SpotifyError> {
        self.token_request(&[("grant_type", "client_credentials")])
            .await
    }

    // =========================================================================
    // Web API
    // =========================================================================

    /// Fetch a playlist with an app-only token, returning Spotify's JSON as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the token grant or the playlist request fails.
    #[instrument(skip(self))]
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<serde_json::Value, SpotifyError> {
        let token = self.client_credentials().await?;
        let url = format!(
            "{}/playlists/{}",
            self.inner.api_base,
            urlencoding::encode(playlist_id)
        );
        debug!(%url, "Spotify GET");

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        Self::parse(response).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn redirect_uri(&self) -> Result<&str, MissingConfig> {
        self.inner
            .redirect_uri
            .as_deref()
            .ok_or(MissingConfig::SpotifyRedirectUri)
    }

    fn basic_auth_header(&self) -> Result<String, MissingConfig> {
        let (Some(id), Some(secret)) = (&self.inner.client_id, &self.inner.client_secret) else {
            return Err(MissingConfig::SpotifyCredentials);
        };
        let encoded = BASE64.encode(format!("{id}:{}", secret.expose_secret()));
        Ok(format!("Basic {encoded}"))
    }

    async fn token_request<T: DeserializeOwned>(
        &self,
        form: &[(&str, &str)],
    ) -> Result<T, SpotifyError> {
        let authorization = self.basic_auth_header()?;
        let url = format!("{}/api/token", self.inner.accounts_base);
        debug!(%url, grant_type = form.first().map(|(_, v)| *v), "Spotify token request");

        let response = self
            .inner
            .client
            .post(&url)
            .header(AUTHORIZATION, authorization)
            .form(form)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SpotifyError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, ErrorEnvelope::into_message);
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SpotifyError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::test_support::config_with_upstream;

    fn client(config: &SpotifyConfig) -> SpotifyClient {
        SpotifyClient::new(config, reqwest::Client::new())
    }

    #[test]
    fn test_authorization_url() {
        let config = config_with_upstream("http://127.0.0.1:9").spotify;
        let url = Url::parse(&client(&config).authorization_url().unwrap()).unwrap();

        assert_eq!(url.path(), "/accounts/authorize");
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "spotify-client-id");
        assert_eq!(params["scope"], SCOPES);
        assert_eq!(
            params["redirect_uri"],
            "https://club.example.edu/api/spotify/callback"
        );
        assert_eq!(params["show_dialog"], "true");
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        let mut config = config_with_upstream("http://127.0.0.1:9").spotify;
        config.client_id = None;

        let err = client(&config).authorization_url().unwrap_err();
        assert!(matches!(
            err,
            SpotifyError::NotConfigured(MissingConfig::SpotifyClientId)
        ));
    }

    #[test]
    fn test_basic_auth_header() {
        let config = config_with_upstream("http://127.0.0.1:9").spotify;
        let header = client(&config).basic_auth_header().unwrap();
        assert_eq!(
            header,
            format!("Basic {}", BASE64.encode("spotify-client-id:s3cr3t-Sp0t1fy"))
        );
    }

    #[tokio::test]
    async fn test_refresh_without_secret_makes_no_call() {
        let mut config = config_with_upstream("http://127.0.0.1:9").spotify;
        config.client_secret = None;

        let err = client(&config).refresh_token("AQA_refresh").await.unwrap_err();
        assert!(matches!(
            err,
            SpotifyError::NotConfigured(MissingConfig::SpotifyCredentials)
        ));
    }
}
