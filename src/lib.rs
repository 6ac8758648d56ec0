//! Stateless demonstration MCP server.
//!
//! Registers a few example tools, one prompt template and one resource, and
//! serves them over STDIO and/or HTTP.

pub mod core;
pub mod prompts;
pub mod resources;
pub mod tools;
