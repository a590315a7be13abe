use mcp_trello::{client::TrelloClient, config::TrelloConfig, server::TrelloMcpServer};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Credentials are mandatory; a bad configuration stops the process here.
    let config = match TrelloConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::error!("Please set TRELLO_API_KEY and TRELLO_OAUTH_TOKEN");
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded Trello configuration for {}", config.base_url);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string());
    let board_id = env::var("TRELLO_BOARD_ID").ok().filter(|b| !b.trim().is_empty());

    let client = Arc::new(TrelloClient::new(config)?);

    if let Some(board_id) = board_id.as_deref() {
        tracing::info!("Checking access to board {}...", board_id);
        match client.validate_board_access(board_id).await {
            Ok(true) => tracing::info!("Board access confirmed"),
            Ok(false) => {
                tracing::error!("Credentials cannot access board {}", board_id);
                tracing::error!("Please verify:");
                tracing::error!("  - TRELLO_BOARD_ID is correct: {}", board_id);
                tracing::error!("  - the OAuth token was granted read/write scope");
                std::process::exit(1);
            }
            Err(e) => {
                tracing::warn!("Board access check failed: {}", e);
                tracing::warn!("The server will continue, but Trello calls may fail.");
            }
        }
    }

    let mut server = TrelloMcpServer::with_client(client);
    if let Some(board_id) = board_id {
        server = server.with_default_board(board_id);
    }

    // Create server configuration and start SSE server
    let config = SseServerConfig {
        bind: bind_addr.parse()?,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: tokio_util::sync::CancellationToken::new(),
        sse_keep_alive: None,
    };

    tracing::info!("Trello MCP Server listening on {}", config.bind);

    let sse_server = SseServer::serve_with_config(config).await?;

    // Every session shares the same client and connection pool.
    let ct = sse_server.with_service(move || server.clone());

    tracing::info!("Trello MCP Server started successfully");

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    ct.cancel();

    Ok(())
}
