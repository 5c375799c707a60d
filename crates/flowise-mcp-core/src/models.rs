//! Data types shared across the adapter.

use serde::{Deserialize, Serialize};

/// A chatflow or assistant as returned by the Flowise listing endpoint.
///
/// Flowise returns many more fields per chatflow; everything beyond what the
/// adapter consumes is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Chatflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
        }
    }
}

/// A dynamic tool bound to one chatflow.
///
/// Bindings are built once at startup and never mutated afterwards; the tool
/// name is unique within a server instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBinding {
    pub tool_name: String,
    pub chatflow_id: String,
    pub description: String,
}
