//! Spotify OAuth relay route handlers.
//!
//! The callback is a browser navigation target, so it never answers with an
//! error status. Every outcome is a redirect to the site with either the
//! tokens or an `error=<code>` query parameter.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use orgsite_core::AccessToken;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::spotify::SpotifyError;
use crate::state::AppState;

/// Error codes the callback reports to the site.
pub mod error_codes {
    pub const AUTH_DENIED: &str = "spotify_auth_denied";
    pub const MISSING_CODE: &str = "spotify_missing_code";
    pub const CONFIG_MISSING: &str = "spotify_config_missing";
    pub const TOKEN_EXCHANGE_FAILED: &str = "spotify_token_exchange_failed";
}

/// Query parameters from the Spotify OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// Error code if the user declined or authorization failed.
    pub error: Option<String>,
}

/// Body of `POST /spotify/refresh`.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Body of `GET /spotify/auth`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Build the Spotify consent page URL for the browser to navigate to.
///
/// # Route
///
/// `GET /spotify/auth`
///
/// # Errors
///
/// 500 if the client id or redirect URI is not configured.
pub async fn auth(State(state): State<AppState>) -> Result<Json<AuthUrlResponse>> {
    let auth_url = state
        .spotify()
        .authorization_url()
        .map_err(|e| AppError::upstream("spotify_authorize", e))?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// Handle the Spotify OAuth callback.
///
/// # Route
///
/// `GET /spotify/callback`
#[instrument(skip_all)]
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let base = state.config().base_url.as_deref().unwrap_or_default();

    if let Some(error) = query.error {
        warn!(%error, "Spotify authorization denied");
        return error_redirect(base, error_codes::AUTH_DENIED);
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        warn!("Spotify callback missing code");
        return error_redirect(base, error_codes::MISSING_CODE);
    };

    match state.spotify().exchange_code(&code).await {
        Ok(tokens) => {
            info!(expires_in = tokens.expires_in, "Spotify code exchanged");
            let url = format!(
                "{base}/?spotify_token={}&spotify_refresh={}&spotify_expires={}",
                urlencoding::encode(&tokens.access_token),
                urlencoding::encode(tokens.refresh_token.as_deref().unwrap_or_default()),
                tokens.expires_in,
            );
            Redirect::to(&url).into_response()
        }
        Err(SpotifyError::NotConfigured(missing)) => {
            warn!(%missing, "Spotify callback without credentials");
            error_redirect(base, error_codes::CONFIG_MISSING)
        }
        Err(e) => {
            warn!(error = %e, "Spotify token exchange failed");
            error_redirect(base, error_codes::TOKEN_EXCHANGE_FAILED)
        }
    }
}

/// Mint an app-only access token.
///
/// # Route
///
/// `POST /spotify/client-credentials`
///
/// # Errors
///
/// 500 if credentials are missing or Spotify rejects the grant.
pub async fn client_credentials(State(state): State<AppState>) -> Result<Json<AccessToken>> {
    let token = state
        .spotify()
        .client_credentials()
        .await
        .map_err(|e| AppError::upstream("spotify_client_credentials", e))?;
    Ok(Json(token))
}

/// Refresh a user access token.
///
/// # Route
///
/// `POST /spotify/refresh`
///
/// # Errors
///
/// 400 without a refresh token, 500 if credentials are missing or Spotify
/// rejects the token.
pub async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessToken>> {
    let refresh_token = payload
        .ok()
        .and_then(|Json(body)| body.refresh_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("refreshToken is required".to_string()))?;

    let token = state
        .spotify()
        .refresh_token(&refresh_token)
        .await
        .map_err(|e| AppError::upstream("spotify_refresh_token", e))?;
    Ok(Json(token))
}

/// Fetch a playlist and pass Spotify's JSON through.
///
/// # Route
///
/// `GET /spotify/playlist/{id}`
///
/// # Errors
///
/// 500 if credentials are missing or either Spotify call fails.
pub async fn playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let playlist = state
        .spotify()
        .get_playlist(&id)
        .await
        .map_err(|e| AppError::upstream("spotify_playlist", e))?;
    Ok(Json(playlist))
}

fn error_redirect(base: &str, code: &str) -> Response {
    Redirect::to(&format!("{base}/?error={code}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header::LOCATION};

    #[test]
    fn test_error_redirect() {
        let response = error_redirect("https://club.example.edu", error_codes::AUTH_DENIED);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "https://club.example.edu/?error=spotify_auth_denied"
        );
    }

    #[test]
    fn test_auth_url_response_shape() {
        let body = serde_json::to_value(AuthUrlResponse {
            auth_url: "https://accounts.example/authorize?response_type=code".to_string(),
        })
        .unwrap_or_default();
        assert_eq!(
            body,
            serde_json::json!({"authUrl": "https://accounts.example/authorize?response_type=code"})
        );
    }

    #[test]
    fn test_refresh_request_accepts_both_spellings() {
        let camel: RefreshRequest =
            serde_json::from_str(r#"{"refreshToken":"AQA"}"#).unwrap_or_default();
        let snake: RefreshRequest =
            serde_json::from_str(r#"{"refresh_token":"AQB"}"#).unwrap_or_default();
        assert_eq!(camel.refresh_token.as_deref(), Some("AQA"));
        assert_eq!(snake.refresh_token.as_deref(), Some("AQB"));
    }
}
