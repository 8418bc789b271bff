//! WikiMed MCP server
//!
//! Serves the WikiMed tools over stdio (default) or streamable HTTP.

use std::path::PathBuf;

use clap::Parser;
use miette::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wikimed_core::WikimedConfig;
use wikimed_mcp::{McpTransport, WikimedMcpServer};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
/// MCP server exposing the WikiMed clinic API as tools
struct Args {
    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Configuration file (defaults to the first of wikimed.toml, the user config dir, ~/.wikimed)
    #[arg(long, env = "WIKIMED_CONFIG")]
    config: Option<PathBuf>,

    /// Transport to serve on: stdio or http
    #[arg(long)]
    transport: Option<McpTransport>,

    /// Bind address for the HTTP transport
    #[arg(long)]
    bind: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();

    let args = Args::parse();

    // Initialize tracing; stdout belongs to the stdio transport
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    let mut config = match &args.config {
        Some(path) => WikimedConfig::load_from(path).await?,
        None => WikimedConfig::load().await?,
    };
    config.apply_env_overrides()?;
    if let Some(transport) = args.transport {
        config.server.transport = transport.to_string();
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout_secs = secs;
    }
    config.validate()?;

    let transport: McpTransport = config.server.transport.parse()?;
    info!(
        "Default WikiMed endpoint: {}, {} pre-configured clients, timeout {}s",
        config.default_client.base_url,
        config.clients.len(),
        config.request_timeout_secs
    );

    let server = WikimedMcpServer::from_config(&config)?;

    info!("Starting WikiMed MCP server...");
    match transport {
        McpTransport::Stdio => server.run_stdio().await?,
        #[cfg(feature = "http")]
        McpTransport::Http => server.run_http(&config.server.bind).await?,
        #[cfg(not(feature = "http"))]
        McpTransport::Http => return Err(wikimed_mcp::ServerError::HttpDisabled.into()),
    }

    Ok(())
}
