pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod mcp;
pub mod models;

pub use client::FlowiseClient;
pub use config::{ServerConfig, ToolMode};
pub use error::{ClientError, ConfigError};
pub use filter::FilterConfig;
pub use mcp::FlowiseMcpServer;
pub use models::{Chatflow, ToolBinding};
