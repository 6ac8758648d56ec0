//! Tools Module
//!
//! Every MCP tool lives in its own module and exports a `register` function
//! that adds it to the registry during server initialization.

pub mod echo_json;
pub mod notification_stream;
pub mod random_number;
pub mod reverse_text;

use crate::core::server::Registry;

/// Register every tool, in the order `tools/list` reports them.
pub fn register_all(registry: &mut Registry) {
    reverse_text::register(registry);
    random_number::register(registry);
    echo_json::register(registry);
    notification_stream::register(registry);
}
