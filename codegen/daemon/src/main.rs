//! antd-codegen
//!
//! Entry points for the antd component codegen bridge.
//!
//! # Usage
//!
//! ```bash
//! # Serve the tool protocol over stdin/stdout (what protocol clients launch)
//! CODEGEN_API_KEY=app-... antd-codegen
//! CODEGEN_API_KEY=app-... antd-codegen stdio
//!
//! # Serve over server-sent events
//! CODEGEN_API_KEY=app-... antd-codegen sse --listen 127.0.0.1:3000
//!
//! # Ask once from a terminal
//! CODEGEN_API_KEY=app-... antd-codegen ask "a login form with remember-me" ./mockup.png
//!
//! # With verbose logging (always on stderr)
//! RUST_LOG=debug antd-codegen stdio
//! ```
//!
//! # Environment Variables
//!
//! - `CODEGEN_API_KEY`: remote chat API credential (required)
//! - `CODEGEN_API_URL`: remote chat API base URL
//! - `CODEGEN_REQUEST_TIMEOUT`: request timeout in seconds (0 disables)
//! - `CODEGEN_LISTEN_ADDR`: SSE listen address
//! - `CODEGEN_CONFIG`: configuration file path
//! - `RUST_LOG`: log filter
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: graceful shutdown, exit code 0

mod cli;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use codegen_core::config::default_config_path;
use codegen_core::transport::serve_stdio;
use codegen_core::{
    load_config_from_path, BridgeConfig, CallerKind, ChatFlow, CodegenTool, McpServer,
    RemoteBackend, ServerInfo, ToolRegistry,
};

use crate::server::SseServer;

/// Log directives used when `RUST_LOG` is not set
const DEFAULT_LOG_DIRECTIVES: &str = "codegen_daemon=info,codegen_core=info";

#[derive(Debug, Parser)]
#[command(
    name = "antd-codegen",
    version,
    about = "Generate antd component code through a remote chat API"
)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/antd-codegen/config.toml)
    #[arg(long, global = true, env = "CODEGEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Serve the tool protocol over stdin/stdout (default)
    Stdio,

    /// Serve the tool protocol over server-sent events
    Sse {
        /// Address to listen on (overrides config and CODEGEN_LISTEN_ADDR)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Ask once and stream the answer to stdout
    Ask {
        /// What to generate
        query: Option<String>,

        /// Reference image to upload with the query
        image_file_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Fatal error");
            eprintln!("antd-codegen: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    // stdout carries protocol frames and answers
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let command = cli.command.unwrap_or(Command::Stdio);

    if let Command::Ask { query: None, .. } = command {
        eprintln!("Usage: antd-codegen ask <query> [imageFilePath]");
        return Ok(ExitCode::FAILURE);
    }

    let config_path = cli.config.or_else(default_config_path);
    let config = load_config_from_path(config_path).context("Failed to load configuration")?;
    info!(
        base_url = %config.base_url,
        source = %config.source(),
        "Configuration loaded"
    );

    match command {
        Command::Stdio => run_stdio(&config).await,
        Command::Sse { listen } => {
            let listen_addr = listen.unwrap_or(config.listen_addr);
            let server = build_server(&config, CallerKind::Push)?;
            SseServer::new(server, listen_addr, config.channel_capacity)
                .run(shutdown_signal())
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask {
            query,
            image_file_path,
        } => {
            let query = query.unwrap_or_default();
            cli::run_ask(build_flow(&config)?, &query, image_file_path).await
        }
    }
}

async fn run_stdio(config: &BridgeConfig) -> anyhow::Result<ExitCode> {
    let server = build_server(config, CallerKind::Pipe)?;

    tokio::select! {
        result = serve_stdio(&server) => {
            result.context("Pipe transport failed")?;
            Ok(ExitCode::SUCCESS)
        }
        () = shutdown_signal() => {
            info!("Pipe transport stopped");
            // The blocking stdin reader would hold up runtime shutdown
            std::process::exit(0);
        }
    }
}

fn build_flow(config: &BridgeConfig) -> anyhow::Result<ChatFlow> {
    let backend = RemoteBackend::from_config(config).context("Failed to create HTTP client")?;
    Ok(ChatFlow::new(Arc::new(backend)))
}

fn build_server(config: &BridgeConfig, caller: CallerKind) -> anyhow::Result<McpServer> {
    let tool = CodegenTool::new(build_flow(config)?, caller);
    let tools = ToolRegistry::new().with(Arc::new(tool));
    Ok(McpServer::new(ServerInfo::default(), tools))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_stdio() {
        let cli = Cli::try_parse_from(["antd-codegen"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_sse_listen_override() {
        let cli = Cli::try_parse_from(["antd-codegen", "sse", "--listen", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Some(Command::Sse { listen }) => {
                assert_eq!(listen, Some("0.0.0.0:8080".parse().unwrap()));
            }
            other => panic!("Expected sse command, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["antd-codegen", "sse", "--listen", "nope"]).is_err());
    }

    #[test]
    fn test_ask_arguments() {
        let cli = Cli::try_parse_from([
            "antd-codegen",
            "--config",
            "/tmp/c.toml",
            "ask",
            "a table",
            "/tmp/mock.png",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Some(Command::Ask {
                query,
                image_file_path,
            }) => {
                assert_eq!(query.as_deref(), Some("a table"));
                assert_eq!(image_file_path, Some(PathBuf::from("/tmp/mock.png")));
            }
            other => panic!("Expected ask command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ask_without_query_fails_before_config() {
        let cli = Cli::try_parse_from(["antd-codegen", "ask"]).unwrap();
        let code = run(cli).await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
