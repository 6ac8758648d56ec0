//! Static resources.

use crate::core::server::{MCPResource, ReadResourceResult, Registry, ResourceContents};

pub const GREETING_URI: &str = "https://example.com/greetings/default";
const GREETING_TEXT: &str = "Hello, world!";
const TEXT_PLAIN: &str = "text/plain";

pub fn greeting() -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContents {
            uri: GREETING_URI.to_string(),
            mime_type: Some(TEXT_PLAIN.to_string()),
            text: GREETING_TEXT.to_string(),
        }],
    }
}

pub fn register_all(registry: &mut Registry) {
    registry.register_resource(
        MCPResource {
            uri: GREETING_URI.to_string(),
            name: "greeting-resource".to_string(),
            mime_type: Some(TEXT_PLAIN.to_string()),
        },
        greeting,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_is_fixed() {
        assert_eq!(greeting(), greeting());
        assert_eq!(
            serde_json::to_value(greeting()).unwrap(),
            serde_json::json!({
                "contents": [{
                    "uri": "https://example.com/greetings/default",
                    "mimeType": "text/plain",
                    "text": "Hello, world!"
                }]
            })
        );
    }
}
