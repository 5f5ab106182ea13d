// Standalone MCP server binary

use anyhow::Result;
use mcpbr_mcp::{register_cnae_tools, CnaeFacade, McpConfig, McpServer, ToolRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("MCP-BR CNAE server starting...");

    let config = McpConfig::from_env()?;
    let facade = Arc::new(CnaeFacade::new(config.build_service()?));

    let mut registry = ToolRegistry::new();
    register_cnae_tools(&mut registry, facade);

    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}
