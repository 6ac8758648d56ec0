//! Prompt templates.
//!
//! `greeting-template` asks the model to greet someone by name.

use serde::Deserialize;

use crate::core::error::ToolError;
use crate::core::server::{
    Content, GetPromptResult, MCPPrompt, MCPPromptArgument, PromptMessage, Registry, Role,
};

pub const GREETING_TEMPLATE: &str = "greeting-template";

#[derive(Deserialize, Debug)]
pub struct GreetingParams {
    pub name: String,
}

pub fn greeting(params: GreetingParams) -> Result<GetPromptResult, ToolError> {
    Ok(GetPromptResult {
        description: None,
        messages: vec![PromptMessage {
            role: Role::User,
            content: Content::text(format!("Please greet {} in a friendly manner.", params.name)),
        }],
    })
}

pub fn register_all(registry: &mut Registry) {
    let prompt = MCPPrompt {
        name: GREETING_TEMPLATE.to_string(),
        description: "A simple greeting prompt template".to_string(),
        arguments: vec![MCPPromptArgument {
            name: "name".to_string(),
            description: "Name to include in greeting".to_string(),
            required: true,
        }],
    };
    registry.register_prompt(prompt, greeting);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_single_user_message() {
        let result = greeting(GreetingParams {
            name: "Ada".to_string(),
        })
        .unwrap();
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
        assert_eq!(
            result.messages[0].content.as_text(),
            "Please greet Ada in a friendly manner."
        );
    }

    #[test]
    fn wire_shape_matches_mcp() {
        let value = serde_json::to_value(
            greeting(GreetingParams {
                name: "Bo".to_string(),
            })
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "messages": [{
                    "role": "user",
                    "content": { "type": "text", "text": "Please greet Bo in a friendly manner." }
                }]
            })
        );
    }
}
