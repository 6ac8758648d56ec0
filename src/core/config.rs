//! Server Configuration
//!
//! All settings come from environment variables and are read once at startup.
//!
//! Environment Variables:
//! - SERVER_NAME: Name of the server (default: "stateless-server")
//! - SERVER_VERSION: Version string (default: "1.0.0")
//! - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "both")
//! - HOST: Bind address for HTTP mode (default: "0.0.0.0")
//! - PORT: Port number for HTTP mode (default: 3000)
//! - WORKER_THREADS: HTTP worker count (default: CPU count, capped at 16)

use std::str::FromStr;

use crate::core::error::ConfigError;

pub const DEFAULT_SERVER_NAME: &str = "stateless-server";
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
const MAX_DEFAULT_WORKERS: usize = 16;

/// Which transports the server binds at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Line-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST with SSE streaming for tool calls
    Http,
    /// STDIO in the background, HTTP in the foreground
    Both,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            "both" => Ok(Self::Both),
            _ => Err(ConfigError::InvalidTransport(s.to_string())),
        }
    }
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
        let version =
            lookup("SERVER_VERSION").unwrap_or_else(|| DEFAULT_SERVER_VERSION.to_string());

        let transport = match lookup("MCP_TRANSPORT_MODE") {
            Some(mode) => mode.parse()?,
            None => TransportMode::Both,
        };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        let workers = match lookup("WORKER_THREADS") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidWorkers { value }),
            },
            None => num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
        };

        Ok(Self {
            name,
            version,
            transport,
            host,
            port,
            workers,
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
