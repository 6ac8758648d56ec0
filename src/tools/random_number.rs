//! `generate-random-number`: uniform integer in the closed range [min, max].
//!
//! `min > max` is rejected as invalid arguments instead of being swapped.

use rand::Rng;
use serde::Deserialize;

use crate::core::error::ToolError;
use crate::core::server::{CallToolResult, MCPTool, Registry, ToolContext};

pub const NAME: &str = "generate-random-number";

const DEFAULT_MAX: i64 = 100;

fn default_max() -> i64 {
    DEFAULT_MAX
}

#[derive(Deserialize, Debug)]
pub struct RandomParams {
    #[serde(default)]
    pub min: i64,
    #[serde(default = "default_max")]
    pub max: i64,
}

pub fn generate<R: Rng>(min: i64, max: i64, rng: &mut R) -> Result<i64, ToolError> {
    if min > max {
        return Err(ToolError::InvalidArgument(format!(
            "min ({min}) must not be greater than max ({max})"
        )));
    }
    Ok(rng.random_range(min..=max))
}

async fn call(params: RandomParams, _ctx: ToolContext) -> Result<CallToolResult, ToolError> {
    let value = generate(params.min, params.max, &mut rand::rng())?;
    Ok(CallToolResult::text(format!("Generated random number: {value}")))
}

pub fn register(registry: &mut Registry) {
    let tool = MCPTool {
        name: NAME.to_string(),
        description: "Generates a random number between min and max".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "min": { "type": "integer", "default": 0 },
                "max": { "type": "integer", "default": DEFAULT_MAX }
            }
        }),
    };
    registry.register_tool(tool, call);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stays_in_range_and_hits_both_endpoints() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let (mut saw_min, mut saw_max) = (false, false);
        for _ in 0..10_000 {
            let v = generate(1, 6, &mut rng).unwrap();
            assert!((1..=6).contains(&v));
            saw_min |= v == 1;
            saw_max |= v == 6;
        }
        assert!(saw_min && saw_max);
    }

    #[test]
    fn degenerate_range_returns_the_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generate(-7, -7, &mut rng), Ok(-7));
    }

    #[test]
    fn full_i64_range_is_accepted() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(generate(i64::MIN, i64::MAX, &mut rng).is_ok());
    }

    #[test]
    fn inverted_range_is_rejected_every_time() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..3 {
            assert_eq!(
                generate(5, 1, &mut rng),
                Err(ToolError::InvalidArgument(
                    "min (5) must not be greater than max (1)".to_string()
                ))
            );
        }
    }

    #[test]
    fn defaults_are_zero_to_one_hundred() {
        let params: RandomParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!((params.min, params.max), (0, 100));
    }
}
