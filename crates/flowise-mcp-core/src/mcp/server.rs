//! MCP server implementation for the Flowise adapter.
//!
//! This module provides an MCP server that exposes Flowise chatflows as
//! callable tools. In simple mode it registers a static two-tool surface
//! (`list_chatflows`, `create_prediction`); in dynamic mode it fetches the
//! chatflow listing once at startup and registers one tool per surviving
//! chatflow.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::schema_for_type,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    schemars::{self, JsonSchema},
    service::{RequestContext, RoleServer},
    transport::stdio,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::FlowiseClient;
use crate::config::{ServerConfig, ToolMode};
use crate::error::ClientError;
use crate::filter::apply_filters;
use crate::mcp::bindings::build_bindings;
use crate::models::{Chatflow, ToolBinding};

/// Flowise MCP Server
///
/// Holds the resolved configuration, the remote backend, and (in dynamic
/// mode) the tool bindings built at startup. Everything is read-only once
/// serving begins.
#[derive(Clone)]
pub struct FlowiseMcpServer {
    backend: Arc<dyn FlowiseBackend>,
    config: Arc<ServerConfig>,
    bindings: Arc<Vec<ToolBinding>>,
}

/// The two Flowise operations the server forwards to. `FlowiseClient` is the
/// production implementation; tests substitute mocks.
#[async_trait::async_trait]
pub trait FlowiseBackend: Send + Sync {
    async fn list_chatflows(&self) -> Result<Vec<Chatflow>, ClientError>;
    async fn predict(&self, chatflow_id: &str, question: &str) -> Result<String, ClientError>;
}

#[async_trait::async_trait]
impl FlowiseBackend for FlowiseClient {
    async fn list_chatflows(&self) -> Result<Vec<Chatflow>, ClientError> {
        FlowiseClient::list_chatflows(self).await
    }

    async fn predict(&self, chatflow_id: &str, question: &str) -> Result<String, ClientError> {
        FlowiseClient::predict(self, chatflow_id, question).await
    }
}

impl FlowiseMcpServer {
    /// Create a server in the mode the configuration selects. Dynamic mode
    /// performs one listing call to build its tool table.
    pub async fn new(config: ServerConfig, client: FlowiseClient) -> Self {
        Self::with_backend(config, Arc::new(client)).await
    }

    /// Create a server over a custom backend.
    pub async fn with_backend(config: ServerConfig, backend: Arc<dyn FlowiseBackend>) -> Self {
        let bindings = match config.mode {
            ToolMode::Simple => Vec::new(),
            ToolMode::Dynamic => Self::load_bindings(&config, backend.as_ref()).await,
        };

        Self {
            backend,
            config: Arc::new(config),
            bindings: Arc::new(bindings),
        }
    }

    /// Fetch, filter, and bind the remote listing. A listing failure or an
    /// empty result is not fatal: the server starts with zero dynamic tools.
    async fn load_bindings(config: &ServerConfig, backend: &dyn FlowiseBackend) -> Vec<ToolBinding> {
        let chatflows = match backend.list_chatflows().await {
            Ok(chatflows) => chatflows,
            Err(error) => {
                tracing::warn!(%error, "failed to list chatflows; starting with no dynamic tools");
                return Vec::new();
            }
        };

        let filtered = apply_filters(chatflows, &config.filter);
        if filtered.is_empty() {
            tracing::warn!("no chatflows survived filtering; starting with no dynamic tools");
        }

        build_bindings(&filtered, config)
    }

    /// The dynamic tool table built at startup (empty in simple mode).
    pub fn bindings(&self) -> &[ToolBinding] {
        &self.bindings
    }

    /// Run the MCP server using stdio transport.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting Flowise MCP server...");
        let server = self.serve(stdio()).await?;
        tracing::info!("MCP server initialized, waiting for requests...");
        server.waiting().await?;
        Ok(())
    }
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for the create_prediction tool
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreatePredictionParams {
    /// Chatflow to run; defaults to the configured chatflow or assistant ID
    #[serde(default)]
    pub chatflow_id: Option<String>,
    /// The question or prompt to send
    pub question: String,
}

/// Parameters for dynamically registered per-chatflow tools
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QuestionParams {
    /// The question or prompt to send
    pub question: String,
}

/// Empty parameters (for tools with no parameters)
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmptyParams {}

/// Chatflow summary for the list_chatflows response
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatflowSummary {
    pub id: String,
    pub name: String,
}

/// Input schema for dynamic tools; every bound chatflow takes one question.
fn question_schema() -> serde_json::Map<String, Value> {
    let schema = serde_json::json!({
        "type": "object",
        "required": ["question"],
        "properties": {
            "question": {
                "type": "string",
                "description": "The question or prompt to send to the chatflow"
            }
        }
    });
    match schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

impl FlowiseMcpServer {
    async fn handle_list_chatflows(&self) -> Result<String, String> {
        let chatflows = self
            .backend
            .list_chatflows()
            .await
            .map_err(|e| format!("Failed to list chatflows: {}", e))?;

        let summaries: Vec<ChatflowSummary> = apply_filters(chatflows, &self.config.filter)
            .into_iter()
            .map(|chatflow| ChatflowSummary {
                id: chatflow.id,
                name: chatflow.name,
            })
            .collect();

        serde_json::to_string_pretty(&summaries)
            .map_err(|e| format!("Failed to serialize chatflows: {}", e))
    }

    async fn handle_create_prediction(
        &self,
        params: CreatePredictionParams,
    ) -> Result<String, String> {
        // explicit argument overrides the configured default
        let target = params
            .chatflow_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| self.config.pinned_id());

        let Some(chatflow_id) = target else {
            return Err("chatflow_id or assistant_id is required".to_string());
        };

        self.backend
            .predict(chatflow_id, &params.question)
            .await
            .map_err(|e| format!("Prediction failed: {}", e))
    }

    async fn handle_bound_prediction(
        &self,
        binding: &ToolBinding,
        params: QuestionParams,
    ) -> Result<String, String> {
        self.backend
            .predict(&binding.chatflow_id, &params.question)
            .await
            .map_err(|e| format!("Prediction failed: {}", e))
    }

    fn find_binding(&self, tool_name: &str) -> Option<&ToolBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.tool_name == tool_name)
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

impl ServerHandler for FlowiseMcpServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = match self.config.mode {
            ToolMode::Simple => {
                "Flowise MCP Server - Use list_chatflows to discover available chatflows \
                and create_prediction to send a question to one of them."
                    .to_string()
            }
            ToolMode::Dynamic => {
                "Flowise MCP Server - Each tool runs one Flowise chatflow; pass a question \
                and receive the chatflow's prediction."
                    .to_string()
            }
        };

        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "flowise-mcp".to_string(),
                title: Some("Flowise MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(instructions),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = match self.config.mode {
            ToolMode::Simple => vec![
                Tool::new(
                    "list_chatflows",
                    "List all chatflows available from the Flowise API, with the configured \
                    whitelist/blacklist filters applied. Returns a JSON array of {id, name}.",
                    schema_for_type::<EmptyParams>(),
                ),
                Tool::new(
                    "create_prediction",
                    "Send a question to a Flowise chatflow and return its prediction. \
                    chatflow_id is optional when one is pre-configured.",
                    schema_for_type::<CreatePredictionParams>(),
                ),
            ],
            ToolMode::Dynamic => self
                .bindings
                .iter()
                .map(|binding| {
                    Tool::new(
                        binding.tool_name.clone(),
                        binding.description.clone(),
                        question_schema(),
                    )
                })
                .collect(),
        };

        Ok(ListToolsResult {
            meta: None,
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let result = match self.config.mode {
            ToolMode::Simple => match request.name.as_ref() {
                "list_chatflows" => self.handle_list_chatflows().await,
                "create_prediction" => {
                    let params: CreatePredictionParams = serde_json::from_value(Value::Object(
                        request.arguments.unwrap_or_default(),
                    ))
                    .map_err(|e| {
                        McpError::invalid_params(format!("Invalid parameters: {}", e), None)
                    })?;
                    self.handle_create_prediction(params).await
                }
                name => Err(format!("Unknown tool: {}", name)),
            },
            ToolMode::Dynamic => match self.find_binding(request.name.as_ref()) {
                Some(binding) => {
                    let params: QuestionParams = serde_json::from_value(Value::Object(
                        request.arguments.unwrap_or_default(),
                    ))
                    .map_err(|e| {
                        McpError::invalid_params(format!("Invalid parameters: {}", e), None)
                    })?;
                    self.handle_bound_prediction(binding, params).await
                }
                None => Err(format!("Unknown tool: {}", request.name)),
            },
        };

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(error) => Ok(CallToolResult::error(vec![Content::text(error)])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use reqwest::StatusCode;
    use std::collections::HashMap;

    // =========================================================================
    // Test Utilities
    // =========================================================================

    /// Backend over a fixed listing; predictions echo their routing so tests
    /// can assert which chatflow a call reached.
    struct MockBackend {
        chatflows: Vec<Chatflow>,
        fail_listing: bool,
        predict_status: Option<(u16, &'static str)>,
    }

    impl MockBackend {
        fn with_chatflows(chatflows: Vec<Chatflow>) -> Self {
            Self {
                chatflows,
                fail_listing: false,
                predict_status: None,
            }
        }

        fn failing_listing() -> Self {
            Self {
                chatflows: Vec::new(),
                fail_listing: true,
                predict_status: None,
            }
        }

        fn failing_predictions(status: u16, message: &'static str) -> Self {
            Self {
                chatflows: Vec::new(),
                fail_listing: false,
                predict_status: Some((status, message)),
            }
        }
    }

    #[async_trait::async_trait]
    impl FlowiseBackend for MockBackend {
        async fn list_chatflows(&self) -> Result<Vec<Chatflow>, ClientError> {
            if self.fail_listing {
                return Err(ClientError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "listing unavailable".to_string(),
                });
            }
            Ok(self.chatflows.clone())
        }

        async fn predict(&self, chatflow_id: &str, question: &str) -> Result<String, ClientError> {
            if let Some((status, message)) = self.predict_status {
                return Err(ClientError::Status {
                    status: StatusCode::from_u16(status).unwrap(),
                    message: message.to_string(),
                });
            }
            Ok(format!("answer from {} to '{}'", chatflow_id, question))
        }
    }

    fn test_config(mode: ToolMode) -> ServerConfig {
        ServerConfig {
            api_key: "test-key".to_string(),
            endpoint: "http://localhost:3000".to_string(),
            mode,
            chatflow_id: None,
            assistant_id: None,
            descriptions: HashMap::new(),
            filter: FilterConfig::default(),
        }
    }

    async fn simple_server(config: ServerConfig, backend: MockBackend) -> FlowiseMcpServer {
        FlowiseMcpServer::with_backend(config, Arc::new(backend)).await
    }

    // =========================================================================
    // Simple Mode Tests
    // =========================================================================

    #[tokio::test]
    async fn test_list_chatflows_applies_filters() {
        let mut config = test_config(ToolMode::Simple);
        config.filter = FilterConfig {
            whitelist_ids: ["a1".to_string()].into_iter().collect(),
            ..FilterConfig::default()
        };
        let backend = MockBackend::with_chatflows(vec![
            Chatflow::new("a1", "Support Bot"),
            Chatflow::new("a2", "Sales"),
        ]);
        let server = simple_server(config, backend).await;

        let json = server.handle_list_chatflows().await.unwrap();
        let summaries: Vec<ChatflowSummary> = serde_json::from_str(&json).unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "a1");
        assert_eq!(summaries[0].name, "Support Bot");
    }

    #[tokio::test]
    async fn test_create_prediction_uses_pinned_chatflow() {
        let mut config = test_config(ToolMode::Simple);
        config.chatflow_id = Some("pinned".to_string());
        let server = simple_server(config, MockBackend::with_chatflows(Vec::new())).await;

        let result = server
            .handle_create_prediction(CreatePredictionParams {
                chatflow_id: None,
                question: "What is AI?".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result, "answer from pinned to 'What is AI?'");
    }

    #[tokio::test]
    async fn test_create_prediction_explicit_id_overrides_pinned() {
        let mut config = test_config(ToolMode::Simple);
        config.chatflow_id = Some("pinned".to_string());
        let server = simple_server(config, MockBackend::with_chatflows(Vec::new())).await;

        let result = server
            .handle_create_prediction(CreatePredictionParams {
                chatflow_id: Some("explicit".to_string()),
                question: "hi".to_string(),
            })
            .await
            .unwrap();

        assert!(result.starts_with("answer from explicit"));
    }

    #[tokio::test]
    async fn test_create_prediction_falls_back_to_assistant_id() {
        let mut config = test_config(ToolMode::Simple);
        config.assistant_id = Some("asst".to_string());
        let server = simple_server(config, MockBackend::with_chatflows(Vec::new())).await;

        let result = server
            .handle_create_prediction(CreatePredictionParams {
                chatflow_id: None,
                question: "hi".to_string(),
            })
            .await
            .unwrap();

        assert!(result.starts_with("answer from asst"));
    }

    #[tokio::test]
    async fn test_create_prediction_requires_some_id() {
        let server = simple_server(
            test_config(ToolMode::Simple),
            MockBackend::with_chatflows(Vec::new()),
        )
        .await;

        let result = server
            .handle_create_prediction(CreatePredictionParams {
                chatflow_id: None,
                question: "hi".to_string(),
            })
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("required"));
    }

    #[tokio::test]
    async fn test_create_prediction_surfaces_remote_error() {
        let mut config = test_config(ToolMode::Simple);
        config.chatflow_id = Some("pinned".to_string());
        let server = simple_server(
            config,
            MockBackend::failing_predictions(500, "chatflow crashed"),
        )
        .await;

        let params = CreatePredictionParams {
            chatflow_id: None,
            question: "hi".to_string(),
        };
        let result = server.handle_create_prediction(params).await;

        assert!(result.is_err());
        let error = result.unwrap_err();
        assert!(error.contains("500"));
        assert!(error.contains("chatflow crashed"));

        // the server keeps serving after a remote failure
        let again = server
            .handle_create_prediction(CreatePredictionParams {
                chatflow_id: None,
                question: "still there?".to_string(),
            })
            .await;
        assert!(again.is_err());
    }

    // =========================================================================
    // Dynamic Mode Tests
    // =========================================================================

    #[tokio::test]
    async fn test_dynamic_bindings_from_listing() {
        let backend = MockBackend::with_chatflows(vec![
            Chatflow::new("a1", "Support Bot"),
            Chatflow::new("a2", "Support Bot"),
        ]);
        let server = simple_server(test_config(ToolMode::Dynamic), backend).await;

        let names: Vec<&str> = server
            .bindings()
            .iter()
            .map(|b| b.tool_name.as_str())
            .collect();
        assert_eq!(names, vec!["support_bot_a1", "support_bot_a2"]);
    }

    #[tokio::test]
    async fn test_dynamic_dispatch_routes_bound_id() {
        let backend = MockBackend::with_chatflows(vec![Chatflow::new("a1", "Support Bot")]);
        let server = simple_server(test_config(ToolMode::Dynamic), backend).await;

        let binding = server.find_binding("support_bot").unwrap();
        let result = server
            .handle_bound_prediction(
                binding,
                QuestionParams {
                    question: "hi".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result, "answer from a1 to 'hi'");
    }

    #[tokio::test]
    async fn test_dynamic_unknown_tool() {
        let backend = MockBackend::with_chatflows(vec![Chatflow::new("a1", "Support Bot")]);
        let server = simple_server(test_config(ToolMode::Dynamic), backend).await;

        assert!(server.find_binding("no_such_tool").is_none());
    }

    #[tokio::test]
    async fn test_dynamic_empty_listing_is_not_fatal() {
        let server = simple_server(
            test_config(ToolMode::Dynamic),
            MockBackend::with_chatflows(Vec::new()),
        )
        .await;
        assert!(server.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_listing_failure_is_not_fatal() {
        let server =
            simple_server(test_config(ToolMode::Dynamic), MockBackend::failing_listing()).await;
        assert!(server.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_all_filtered_out() {
        let mut config = test_config(ToolMode::Dynamic);
        config.filter = FilterConfig {
            blacklist_ids: ["a1".to_string()].into_iter().collect(),
            ..FilterConfig::default()
        };
        let backend = MockBackend::with_chatflows(vec![Chatflow::new("a1", "Support Bot")]);
        let server = simple_server(config, backend).await;

        assert!(server.bindings().is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_descriptions_from_config() {
        let mut config = test_config(ToolMode::Dynamic);
        config.descriptions =
            HashMap::from([("a1".to_string(), "Answers support questions".to_string())]);
        let backend = MockBackend::with_chatflows(vec![Chatflow::new("a1", "Support Bot")]);
        let server = simple_server(config, backend).await;

        assert_eq!(server.bindings()[0].description, "Answers support questions");
    }

    // =========================================================================
    // ServerHandler Trait Tests
    // =========================================================================

    #[tokio::test]
    async fn test_get_info() {
        let server = simple_server(
            test_config(ToolMode::Simple),
            MockBackend::with_chatflows(Vec::new()),
        )
        .await;

        let info = server.get_info();

        assert_eq!(info.server_info.name, "flowise-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_question_schema_shape() {
        let schema = question_schema();
        assert_eq!(schema.get("type"), Some(&Value::from("object")));
        assert_eq!(
            schema.get("required"),
            Some(&serde_json::json!(["question"]))
        );
    }
}
