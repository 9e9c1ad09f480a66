//! Spotify wire types.

use serde::Deserialize;

/// Error bodies from Spotify.
///
/// The Accounts service uses the OAuth shape
/// (`{"error": "invalid_grant", "error_description": ...}`), the Web API
/// nests an object (`{"error": {"status": 404, "message": ...}}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorEnvelope {
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
    Api {
        error: ApiErrorBody,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub(crate) fn into_message(self) -> String {
        match self {
            Self::OAuth {
                error,
                error_description: Some(description),
            } => format!("{error}: {description}"),
            Self::OAuth { error, .. } => error,
            Self::Api { error } => error.message.unwrap_or_default(),
        }
    }
}
