//! HTTP client for the Flowise REST API.
//!
//! The adapter consumes exactly two remote operations: listing chatflows and
//! running a prediction. One outbound call per invocation, no caching, no
//! retries; connection pooling is whatever `reqwest` provides.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::ClientError;
use crate::models::Chatflow;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client bound to one Flowise instance.
#[derive(Debug, Clone)]
pub struct FlowiseClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FlowiseClient {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_endpoint(&config.endpoint, &config.api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(concat!("flowise-mcp/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch all chatflows visible to the configured API key.
    pub async fn list_chatflows(&self) -> Result<Vec<Chatflow>, ClientError> {
        let url = format!("{}/api/v1/chatflows", self.endpoint);
        debug!(%url, "fetching chatflows");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                message: body,
            });
        }

        let chatflows: Vec<Chatflow> = serde_json::from_str(&body)?;
        debug!(count = chatflows.len(), "fetched chatflows");
        Ok(chatflows)
    }

    /// Run a prediction against one chatflow and return the raw response
    /// text. Structured responses are relayed verbatim (stringified).
    pub async fn predict(&self, chatflow_id: &str, question: &str) -> Result<String, ClientError> {
        let url = format!("{}/api/v1/prediction/{}", self.endpoint, chatflow_id);
        debug!(%url, chatflow_id, "sending prediction request");

        let payload = serde_json::json!({
            "chatflowId": chatflow_id,
            "question": question,
            "streaming": false,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                message: body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = FlowiseClient::with_endpoint("http://localhost:3000/", "key");
        assert_eq!(client.endpoint, "http://localhost:3000");
    }

    #[test]
    fn test_chatflow_deserialization_ignores_extra_fields() {
        let body = r#"[
            {"id": "a1", "name": "Support Bot", "deployed": true, "flowData": "{}"},
            {"id": "a2", "name": "Sales", "category": "sales;crm"}
        ]"#;

        let chatflows: Vec<Chatflow> = serde_json::from_str(body).unwrap();
        assert_eq!(chatflows.len(), 2);
        assert_eq!(chatflows[0], Chatflow::new("a1", "Support Bot"));
        assert_eq!(chatflows[1].category.as_deref(), Some("sales;crm"));
    }
}
