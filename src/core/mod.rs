//! Core Server Framework Module
//!
//! This module contains the core server implementation including:
//! - server.rs: JSON-RPC structures, capability registry and dispatcher
//! - transport.rs: HTTP and STDIO transports
//! - notify.rs: out-of-band notification delivery for tools
//! - config.rs: environment-driven configuration
//! - error.rs: error types and JSON-RPC error codes

pub mod config;
pub mod error;
pub mod notify;
pub mod server;
pub mod transport;
