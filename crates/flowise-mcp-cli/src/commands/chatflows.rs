use anyhow::Result;
use comfy_table::{Cell, Table};
use flowise_mcp_core::filter::apply_filters;
use flowise_mcp_core::{FlowiseClient, ServerConfig};

use crate::cli::OutputFormat;
use crate::output::{print_json, print_table};

pub async fn run(format: OutputFormat) -> Result<()> {
    let config = ServerConfig::from_env()?;
    let client = FlowiseClient::new(&config);

    let chatflows = client.list_chatflows().await?;
    let chatflows = apply_filters(chatflows, &config.filter);

    if format.is_json() {
        return print_json(&chatflows);
    }

    if chatflows.is_empty() {
        println!("No chatflows available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category"]);

    for chatflow in chatflows {
        table.add_row(vec![
            Cell::new(chatflow.id),
            Cell::new(chatflow.name),
            Cell::new(chatflow.category.unwrap_or_default()),
        ]);
    }

    print_table(table)
}
