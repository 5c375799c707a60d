//! Error types for the Flowise adapter.

use thiserror::Error;

/// Configuration errors. Always fatal: reported before the serving loop
/// starts and turned into a non-zero exit.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("FLOWISE_API_KEY is not set")]
    MissingApiKey,

    #[error("FLOWISE_CHATFLOW_ID and FLOWISE_ASSISTANT_ID are mutually exclusive; set only one")]
    ConflictingIds,

    #[error("invalid regex in {var}: {source}")]
    InvalidPattern {
        var: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid FLOWISE_CHATFLOW_DESCRIPTIONS entry: '{0}' (expected id:description)")]
    InvalidDescriptions(String),
}

/// Errors from the Flowise HTTP API.
///
/// Surfaced to MCP callers as failed tool calls; never fatal to the server
/// process. No automatic retries.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Flowise API returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("request to Flowise timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("invalid JSON in Flowise response: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}
