//! Server configuration loaded from environment variables.
//!
//! Provider credentials are all optional at startup: a missing key surfaces
//! per request as [`MissingConfig`] (mapped to a JSON error or an error
//! redirect), never as a crash.
//!
//! # Environment Variables
//!
//! ## Server
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SITE_BASE_URL` - Public URL of the site, used for redirect targets
//! - `UPSTREAM_TIMEOUT_SECS` - Timeout for every outbound HTTP call (default: 30)
//! - `SYNC_CONCURRENCY` - Products synced in parallel (default: 1, sequential)
//!
//! ## Stripe
//! - `STRIPE_SECRET_KEY` - Secret API key
//! - `STRIPE_PUBLISHABLE_KEY` - Publishable key (exposed on `/health/ready`)
//! - `STRIPE_API_BASE` - API base URL (default: <https://api.stripe.com/v1>)
//!
//! ## Printful
//! - `PRINTFUL_API_KEY` - Store API token
//! - `PRINTFUL_API_BASE` - API base URL (default: <https://api.printful.com>)
//!
//! ## Spotify
//! - `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET` - OAuth app credentials
//! - `SPOTIFY_REDIRECT_URI` - Registered callback URL
//! - `SPOTIFY_ACCOUNTS_BASE` - Accounts service (default: <https://accounts.spotify.com>)
//! - `SPOTIFY_API_BASE` - Web API (default: <https://api.spotify.com/v1>)
//!
//! ## Observability
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Sentry error tracking
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::StatusCode;
use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
pub const DEFAULT_PRINTFUL_API_BASE: &str = "https://api.printful.com";
pub const DEFAULT_SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 2.5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// A required setting that is absent for the operation being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingConfig {
    #[error("STRIPE_SECRET_KEY is not configured")]
    StripeSecretKey,
    #[error("PRINTFUL_API_KEY is not configured")]
    PrintfulApiKey,
    #[error("SPOTIFY_CLIENT_ID is not configured")]
    SpotifyClientId,
    #[error("Spotify client credentials are not configured")]
    SpotifyCredentials,
    #[error("SPOTIFY_REDIRECT_URI is not configured")]
    SpotifyRedirectUri,
    #[error("SITE_BASE_URL is not configured")]
    BaseUrl,
}

impl MissingConfig {
    /// Status code the HTTP surface reports for this setting.
    ///
    /// A missing Printful key is reported as a client error on the sync
    /// routes; everything else is a server fault.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::PrintfulApiKey => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site (no trailing slash)
    pub base_url: Option<String>,
    /// Timeout applied to every outbound provider call
    pub upstream_timeout: Duration,
    /// Maximum number of products synced concurrently (>= 1)
    pub sync_concurrency: usize,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Printful configuration
    pub printful: PrintfulConfig,
    /// Spotify configuration
    pub spotify: SpotifyConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: Option<SecretString>,
    pub publishable_key: Option<String>,
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("publishable_key", &self.publishable_key)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Printful API configuration.
#[derive(Clone)]
pub struct PrintfulConfig {
    pub api_key: Option<SecretString>,
    pub api_base: String,
}

impl std::fmt::Debug for PrintfulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Spotify OAuth configuration.
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    pub accounts_base: String,
    pub api_base: String,
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("accounts_base", &self.accounts_base)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed
    /// (bad port, non-numeric timeout, zero concurrency).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SITE_HOST", "127.0.0.1")?;
        let port = parse_env("SITE_PORT", "3000")?;
        let base_url = get_optional_env("SITE_BASE_URL").map(|url| normalize_base(&url));
        let upstream_timeout = Duration::from_secs(parse_env("UPSTREAM_TIMEOUT_SECS", "30")?);

        let sync_concurrency: usize = parse_env("SYNC_CONCURRENCY", "1")?;
        if sync_concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            upstream_timeout,
            sync_concurrency,
            stripe: StripeConfig::from_env(),
            printful: PrintfulConfig::from_env(),
            spotify: SpotifyConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f == "json"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Public base URL, required by operations that build redirect targets.
    ///
    /// # Errors
    ///
    /// Returns [`MissingConfig::BaseUrl`] if `SITE_BASE_URL` is unset.
    pub fn require_base_url(&self) -> Result<&str, MissingConfig> {
        self.base_url.as_deref().ok_or(MissingConfig::BaseUrl)
    }
}

impl StripeConfig {
    fn from_env() -> Self {
        Self {
            secret_key: get_optional_secret("STRIPE_SECRET_KEY"),
            publishable_key: get_optional_env("STRIPE_PUBLISHABLE_KEY"),
            api_base: normalize_base(&get_env_or_default(
                "STRIPE_API_BASE",
                DEFAULT_STRIPE_API_BASE,
            )),
        }
    }
}

impl PrintfulConfig {
    fn from_env() -> Self {
        Self {
            api_key: get_optional_secret("PRINTFUL_API_KEY"),
            api_base: normalize_base(&get_env_or_default(
                "PRINTFUL_API_BASE",
                DEFAULT_PRINTFUL_API_BASE,
            )),
        }
    }
}

impl SpotifyConfig {
    fn from_env() -> Self {
        Self {
            client_id: get_optional_env("SPOTIFY_CLIENT_ID"),
            client_secret: get_optional_secret("SPOTIFY_CLIENT_SECRET"),
            redirect_uri: get_optional_env("SPOTIFY_REDIRECT_URI"),
            accounts_base: normalize_base(&get_env_or_default(
                "SPOTIFY_ACCOUNTS_BASE",
                DEFAULT_SPOTIFY_ACCOUNTS_BASE,
            )),
            api_base: normalize_base(&get_env_or_default(
                "SPOTIFY_API_BASE",
                DEFAULT_SPOTIFY_API_BASE,
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Strip trailing slashes so paths can be appended with `format!`.
fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Load an optional secret, discarding values that look like placeholders.
fn get_optional_secret(key: &str) -> Option<SecretString> {
    let value = get_optional_env(key)?;
    match check_secret_strength(&value) {
        Ok(()) => Some(SecretString::from(value)),
        Err(reason) => {
            tracing::warn!(variable = key, %reason, "Ignoring insecure secret");
            None
        }
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and trivially low-entropy strings.
fn check_secret_strength(secret: &str) -> Result<(), String> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(format!("appears to be a placeholder (contains '{pattern}')"));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }

    Ok(())
}
