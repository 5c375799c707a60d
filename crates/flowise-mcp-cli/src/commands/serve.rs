use anyhow::Result;
use flowise_mcp_core::config::redact_api_key;
use flowise_mcp_core::{FlowiseClient, FlowiseMcpServer, ServerConfig};
use tracing::info;

pub async fn run() -> Result<()> {
    let config = ServerConfig::from_env()?;
    info!(
        endpoint = %config.endpoint,
        api_key = %redact_api_key(&config.api_key),
        mode = ?config.mode,
        "resolved configuration"
    );

    let client = FlowiseClient::new(&config);
    let server = FlowiseMcpServer::new(config, client).await;
    server.run().await
}
