//! OAuth token shapes relayed to the browser.
//!
//! Tokens are never stored server-side; they pass straight from the
//! provider's token endpoint to the caller.

use serde::{Deserialize, Serialize};

/// Tokens obtained from an authorization-code exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from issuance.
    pub expires_in: i64,
}

/// Access token returned by refresh and client-credentials grants.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

impl From<OAuthTokenSet> for AccessToken {
    fn from(token: OAuthTokenSet) -> Self {
        Self {
            access_token: token.access_token,
            expires_in: token.expires_in,
        }
    }
}

// Manual Debug impls keep tokens out of logs.
impl std::fmt::Debug for OAuthTokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenSet")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
