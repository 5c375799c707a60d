//! Environment-driven configuration.
//!
//! All settings are resolved once at startup into an immutable
//! [`ServerConfig`]; nothing reads the environment after that. Validation is
//! fail-fast: a contradictory or malformed setting aborts startup before the
//! server ever accepts a request.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::filter::FilterConfig;

/// Base URL used when `FLOWISE_API_ENDPOINT` is unset.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";

/// Which tool surface the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// Two static tools: `list_chatflows` and `create_prediction`.
    Simple,
    /// One tool per filtered chatflow, bound at startup.
    Dynamic,
}

/// Process-wide configuration, constructed once and passed explicitly to
/// every component that needs it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bearer token for all Flowise calls.
    pub api_key: String,
    /// Base URL of the Flowise instance, without a trailing slash.
    pub endpoint: String,
    pub mode: ToolMode,
    /// Pins `create_prediction` to one chatflow in simple mode.
    pub chatflow_id: Option<String>,
    /// Alternate identifier kind; mutually exclusive with `chatflow_id`.
    pub assistant_id: Option<String>,
    /// Per-chatflow tool descriptions for dynamic mode, keyed by ID.
    pub descriptions: HashMap<String, String>,
    pub filter: FilterConfig,
}

impl ServerConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup. Tests inject maps
    /// here instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = non_empty(lookup("FLOWISE_API_KEY")).ok_or(ConfigError::MissingApiKey)?;

        let endpoint = non_empty(lookup("FLOWISE_API_ENDPOINT"))
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let mode = if is_truthy(lookup("FLOWISE_SIMPLE_MODE").as_deref()) {
            ToolMode::Simple
        } else {
            ToolMode::Dynamic
        };

        let chatflow_id = non_empty(lookup("FLOWISE_CHATFLOW_ID"));
        let assistant_id = non_empty(lookup("FLOWISE_ASSISTANT_ID"));
        if chatflow_id.is_some() && assistant_id.is_some() {
            return Err(ConfigError::ConflictingIds);
        }

        let descriptions =
            parse_descriptions(lookup("FLOWISE_CHATFLOW_DESCRIPTIONS").as_deref())?;
        let filter = FilterConfig::from_lookup(&lookup)?;

        Ok(Self {
            api_key,
            endpoint,
            mode,
            chatflow_id,
            assistant_id,
            descriptions,
            filter,
        })
    }

    /// The identifier `create_prediction` falls back to when the caller does
    /// not supply one. The chatflow ID wins if both kinds were configured
    /// (validation rejects that case anyway).
    pub fn pinned_id(&self) -> Option<&str> {
        self.chatflow_id
            .as_deref()
            .or(self.assistant_id.as_deref())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}

/// Parse comma-separated `id:description` pairs. The description may itself
/// contain colons; only the first one separates the ID.
fn parse_descriptions(raw: Option<&str>) -> Result<HashMap<String, String>, ConfigError> {
    let mut descriptions = HashMap::new();
    let Some(raw) = raw else {
        return Ok(descriptions);
    };

    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (id, description) = pair
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidDescriptions(pair.to_string()))?;
        let (id, description) = (id.trim(), description.trim());
        if id.is_empty() || description.is_empty() {
            return Err(ConfigError::InvalidDescriptions(pair.to_string()));
        }
        descriptions.insert(id.to_string(), description.to_string());
    }

    Ok(descriptions)
}

/// Redact an API key for log output.
pub fn redact_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "<not set>".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
}
