//! notion-mcp-agent - HTTP server entry point.
//!
//! Starts the A2A server that exposes the Notion agent.

use clap::Parser;
use notion_mcp_agent::{api, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notion-mcp-agent")]
#[command(about = "A2A server for a Notion-backed conversational agent")]
struct Cli {
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "localhost")]
    host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 10001)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notion_mcp_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration; a missing NOTION_API_KEY aborts here, before any
    // listener is bound.
    let config = Config::from_env()?.with_address(cli.host, cli.port);
    info!("Loaded configuration: model={}", config.default_model);

    api::serve(config).await
}
