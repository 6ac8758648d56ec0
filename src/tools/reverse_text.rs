//! `reverse-text`: reverses a string.
//!
//! Reversal works on extended grapheme clusters, so a base letter keeps its
//! combining marks and regional-indicator pairs (flags) stay paired.

use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::error::ToolError;
use crate::core::server::{CallToolResult, MCPTool, Registry, ToolContext};

pub const NAME: &str = "reverse-text";

#[derive(Deserialize, Debug)]
pub struct ReverseParams {
    pub text: String,
}

pub fn reverse(text: &str) -> String {
    text.graphemes(true).rev().collect()
}

async fn call(params: ReverseParams, _ctx: ToolContext) -> Result<CallToolResult, ToolError> {
    Ok(CallToolResult::text(format!(
        "Reversed text: {}",
        reverse(&params.text)
    )))
}

pub fn register(registry: &mut Registry) {
    let tool = MCPTool {
        name: NAME.to_string(),
        description: "Reverses a given string".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to reverse"
                }
            },
            "required": ["text"]
        }),
    };
    registry.register_tool(tool, call);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverses_ascii_and_empty() {
        assert_eq!(reverse("hello"), "olleh");
        assert_eq!(reverse(""), "");
    }

    #[test]
    fn keeps_multibyte_characters_whole() {
        assert_eq!(reverse("añb"), "bña");
        assert_eq!(reverse("日本語"), "語本日");
        // U+1F980 is four bytes in UTF-8 and a surrogate pair in UTF-16
        assert_eq!(reverse("a🦀b"), "b🦀a");
    }

    #[test]
    fn combining_marks_stay_on_their_base() {
        assert_eq!(reverse("e\u{301}x"), "xe\u{301}");
        assert_eq!(reverse("\u{e9}x"), "x\u{e9}");
    }

    #[test]
    fn flags_and_emoji_sequences_stay_intact() {
        // JP flag, not PJ
        assert_eq!(
            reverse("e\u{301}x \u{1F1EF}\u{1F1F5}"),
            "\u{1F1EF}\u{1F1F5} xe\u{301}"
        );
        // family emoji joined with ZWJ
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        assert_eq!(reverse(&format!("a{family}b")), format!("b{family}a"));
    }

    #[test]
    fn double_reverse_is_identity() {
        for s in ["", "a", "abc def", "añb🦀", "e\u{301}\u{1F1EF}\u{1F1F5}", "\t\n\0"] {
            assert_eq!(reverse(&reverse(s)), s);
        }
    }
}
