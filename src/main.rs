//! htb-mcp-server: MCP server exposing HackTheBox labs operations as tools.
//!
//! Speaks JSON-RPC over stdin/stdout. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use htb_mcp_server::config;
use htb_mcp_server::htb::{Backend, HtbClient};
use htb_mcp_server::mcp::server::McpServer;
use htb_mcp_server::mcp::transport::StdioTransport;
use htb_mcp_server::tools::ToolRegistry;

/// MCP server for the HackTheBox labs platform.
///
/// Configuration is read from the environment; `HTB_TOKEN` is required.
#[derive(Parser, Debug)]
#[command(name = "htb-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments, falling back to `LOG_LEVEL`.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Stdout carries protocol traffic, so
/// logs must go to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the htb-mcp-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("\nSet HTB_TOKEN to an app token from your HackTheBox profile settings.");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.log_level));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %cfg.htb_base_url,
        request_timeout = ?cfg.request_timeout,
        tool_timeout = ?cfg.tool_timeout,
        "Starting htb-mcp-server"
    );

    let backend: Arc<dyn Backend> = match HtbClient::from_config(&cfg) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to create HTB API client");
            return ExitCode::FAILURE;
        }
    };

    let registry = ToolRegistry::with_htb_tools(&backend);
    let mut server = McpServer::new(StdioTransport::stdio(), registry, backend)
        .with_call_timeout(cfg.tool_timeout);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        server.start().await?;
        info!("MCP server ready, waiting for client messages");
        server.run().await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
