//! `echo-json`: returns the caller's JSON object rendered back as text.
//!
//! Objects keep their insertion order (serde_json `preserve_order`) and
//! numbers keep their exact digits (`arbitrary_precision`), so the rendered
//! text parses back to an identical value.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::error::ToolError;
use crate::core::server::{CallToolResult, MCPTool, Registry, ToolContext};

pub const NAME: &str = "echo-json";
pub const PREFIX: &str = "Echoed JSON: ";

#[derive(Deserialize, Debug)]
pub struct EchoParams {
    pub input: Map<String, Value>,
}

/// Pretty-print with two-space indentation.
pub fn render(input: &Map<String, Value>) -> Result<String, ToolError> {
    serde_json::to_string_pretty(input).map_err(|e| ToolError::Internal(e.to_string()))
}

async fn call(params: EchoParams, _ctx: ToolContext) -> Result<CallToolResult, ToolError> {
    let rendered = render(&params.input)?;
    Ok(CallToolResult::text(format!("{PREFIX}{rendered}")))
}

pub fn register(registry: &mut Registry) {
    let tool = MCPTool {
        name: NAME.to_string(),
        description: "Returns the exact input JSON for testing serialization".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "object",
                    "additionalProperties": true,
                    "description": "JSON object to echo back"
                }
            },
            "required": ["input"]
        }),
    };
    registry.register_tool(tool, call);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn round_trip_preserves_structure_and_key_order() {
        let input = as_object(json!({
            "zeta": 1,
            "alpha": { "nested": [1, "two", null, true, { "b": 2, "a": 1 }] },
            "mid": -3.5,
            "unicode": "añ🦀"
        }));

        let rendered = render(&input).unwrap();
        let parsed = as_object(serde_json::from_str(&rendered).unwrap());

        assert_eq!(parsed, input);
        let keys: Vec<_> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid", "unicode"]);
        let inner: Vec<_> = parsed["alpha"]["nested"][4]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(inner, ["b", "a"]);
    }

    #[test]
    fn wide_and_precise_numbers_are_not_rounded() {
        let source = r#"{"n":123456789012345678901234567890,"f":0.1000000000000000055511151231257827,"neg":-98765432109876543210}"#;
        let input = as_object(serde_json::from_str(source).unwrap());

        let rendered = render(&input).unwrap();

        assert!(rendered.contains("123456789012345678901234567890"), "{rendered}");
        assert!(rendered.contains("0.1000000000000000055511151231257827"), "{rendered}");
        assert!(rendered.contains("-98765432109876543210"), "{rendered}");
        assert_eq!(as_object(serde_json::from_str(&rendered).unwrap()), input);
    }

    #[test]
    fn empty_object_renders_as_braces() {
        assert_eq!(render(&Map::new()).unwrap(), "{}");
    }

    #[test]
    fn uses_two_space_indentation() {
        let rendered = render(&as_object(json!({ "a": 1 }))).unwrap();
        assert_eq!(rendered, "{\n  \"a\": 1\n}");
    }
}
