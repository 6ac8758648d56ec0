//! MCP Server Entry Point
//!
//! Reads configuration from the environment (see [`ServerConfig`]), sets up
//! logging to stderr and starts the configured transports.

use std::process;
use std::sync::Arc;

use stateless_mcp_server::core::config::{ServerConfig, TransportMode};
use stateless_mcp_server::core::server::{AppState, Dispatcher, initialize_registry};
use stateless_mcp_server::core::transport;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // stdout carries the STDIO protocol, so logs must go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(
        AppState {
            server_name: config.name.clone(),
            server_version: config.version.clone(),
        },
        initialize_registry(),
    ));

    match config.transport {
        TransportMode::Stdio => transport::run_server_stdio(dispatcher).await,
        TransportMode::Http => transport::run_server_http(dispatcher, &config).await,
        TransportMode::Both => {
            // STDIO in the background for local inspectors, HTTP in the foreground
            let stdio_dispatcher = Arc::clone(&dispatcher);
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = transport::run_server_stdio(stdio_dispatcher).await {
                    error!(error = %e, "STDIO server error");
                }
            });

            let http_result = transport::run_server_http(dispatcher, &config).await;
            stdio_handle.abort();
            http_result
        }
    }
}
