//! Whitelist/blacklist filtering of the remote chatflow listing.

use std::collections::HashSet;

use regex::Regex;

use crate::error::ConfigError;
use crate::models::Chatflow;

/// Inclusion/exclusion rules parsed once at startup.
///
/// A whitelisted chatflow (by exact ID or name pattern) is never excluded by
/// blacklist rules; with no whitelist configured, everything not blacklisted
/// passes.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub whitelist_ids: HashSet<String>,
    pub blacklist_ids: HashSet<String>,
    pub whitelist_name_pattern: Option<Regex>,
    pub blacklist_name_pattern: Option<Regex>,
}

impl FilterConfig {
    pub(crate) fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            whitelist_ids: parse_id_list(lookup("FLOWISE_WHITELIST_ID")),
            blacklist_ids: parse_id_list(lookup("FLOWISE_BLACKLIST_ID")),
            whitelist_name_pattern: compile_pattern(
                "FLOWISE_WHITELIST_NAME_REGEX",
                lookup("FLOWISE_WHITELIST_NAME_REGEX"),
            )?,
            blacklist_name_pattern: compile_pattern(
                "FLOWISE_BLACKLIST_NAME_REGEX",
                lookup("FLOWISE_BLACKLIST_NAME_REGEX"),
            )?,
        })
    }

    /// True when no rule of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.whitelist_ids.is_empty()
            && self.blacklist_ids.is_empty()
            && self.whitelist_name_pattern.is_none()
            && self.blacklist_name_pattern.is_none()
    }

    fn has_whitelist(&self) -> bool {
        !self.whitelist_ids.is_empty() || self.whitelist_name_pattern.is_some()
    }

    fn whitelisted(&self, chatflow: &Chatflow) -> bool {
        self.whitelist_ids.contains(&chatflow.id)
            || self
                .whitelist_name_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(&chatflow.name))
    }

    fn blacklisted(&self, chatflow: &Chatflow) -> bool {
        self.blacklist_ids.contains(&chatflow.id)
            || self
                .blacklist_name_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(&chatflow.name))
    }

    /// Whether a chatflow survives the configured rules.
    pub fn admits(&self, chatflow: &Chatflow) -> bool {
        if self.has_whitelist() {
            // whitelist membership wins over any blacklist rule
            return self.whitelisted(chatflow);
        }
        !self.blacklisted(chatflow)
    }
}

/// Apply the configured rules to a listing, preserving its order.
pub fn apply_filters(chatflows: Vec<Chatflow>, filter: &FilterConfig) -> Vec<Chatflow> {
    chatflows
        .into_iter()
        .filter(|chatflow| filter.admits(chatflow))
        .collect()
}

fn parse_id_list(raw: Option<String>) -> HashSet<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn compile_pattern(
    var: &'static str,
    raw: Option<String>,
) -> Result<Option<Regex>, ConfigError> {
    match raw.map(|value| value.trim().to_string()) {
        Some(pattern) if !pattern.is_empty() => Regex::new(&pattern)
            .map(Some)
            .map_err(|source| ConfigError::InvalidPattern { var, source }),
        _ => Ok(None),
    }
}
