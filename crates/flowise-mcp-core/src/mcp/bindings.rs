//! Tool-name derivation and chatflow-to-tool binding.

use std::collections::{HashMap, HashSet};

use crate::config::ServerConfig;
use crate::models::{Chatflow, ToolBinding};

/// Normalize a display name into an identifier-safe tool name: lowercase,
/// with runs of non-alphanumeric characters collapsed to single underscores
/// and no leading or trailing underscore.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }
    out
}

fn base_name(chatflow: &Chatflow) -> String {
    let normalized = normalize(&chatflow.name);
    if normalized.is_empty() {
        // a name made entirely of separators still needs a usable tool name
        format!("chatflow_{}", normalize(&chatflow.id))
    } else {
        normalized
    }
}

/// Derive one unique tool name per record, preserving input order.
///
/// Deterministic: the same listing always produces the same names. Records
/// whose names normalize identically take a normalized-ID suffix; duplicate
/// IDs fall back to a numeric index, so uniqueness holds for arbitrarily many
/// collisions.
pub fn derive_tool_names(chatflows: &[Chatflow]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for chatflow in chatflows {
        *counts.entry(base_name(chatflow)).or_default() += 1;
    }

    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(chatflows.len());
    for chatflow in chatflows {
        let base = base_name(chatflow);
        let with_suffix = if counts[&base] > 1 {
            format!("{}_{}", base, normalize(&chatflow.id))
        } else {
            base
        };

        let mut candidate = with_suffix.clone();
        let mut index = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{}_{}", with_suffix, index);
            index += 1;
        }
        names.push(candidate);
    }
    names
}

/// Pair each chatflow with its derived tool name and description. The
/// configured per-ID description wins; the chatflow's display name is the
/// fallback.
pub fn build_bindings(chatflows: &[Chatflow], config: &ServerConfig) -> Vec<ToolBinding> {
    let names = derive_tool_names(chatflows);
    chatflows
        .iter()
        .zip(names)
        .map(|(chatflow, tool_name)| ToolBinding {
            tool_name,
            chatflow_id: chatflow.id.clone(),
            description: config
                .descriptions
                .get(&chatflow.id)
                .cloned()
                .unwrap_or_else(|| chatflow.name.clone()),
        })
        .collect()
}
