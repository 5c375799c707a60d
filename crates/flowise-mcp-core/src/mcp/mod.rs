//! MCP (Model Context Protocol) server for the Flowise adapter.
//!
//! Exposes Flowise chatflows to Claude Code and other MCP-compatible clients,
//! either as a static two-tool surface or as one tool per chatflow.

pub mod bindings;
pub mod server;

pub use bindings::{build_bindings, derive_tool_names};
pub use server::{FlowiseBackend, FlowiseMcpServer};
