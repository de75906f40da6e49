//! A handful of simple tools used by tests and as a minimal working example registry.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::ToolError;
use crate::tools::tool::{ArgSpec, ArgsSchema, Tool};

/// Returns its `text` argument unchanged.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn friendly_name(&self) -> &str {
        "Echo"
    }

    fn args_schema(&self) -> ArgsSchema {
        ArgsSchema::new(vec![ArgSpec {
            name: "text".into(),
            description: "text to echo back".into(),
            required: true,
        }])
    }

    async fn call(&self, args: Value, _ctx: &RequestContext) -> Result<String, ToolError> {
        args.get("text")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::InvalidArgs {
                tool: self.name().to_string(),
                detail: "`text` must be a string".into(),
            })
    }
}

/// Parses `value` as an integer and adds `amount` (default 1).
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn friendly_name(&self) -> &str {
        "Add"
    }

    fn args_schema(&self) -> ArgsSchema {
        ArgsSchema::new(vec![
            ArgSpec {
                name: "value".into(),
                description: "base integer, as a string or number".into(),
                required: true,
            },
            ArgSpec {
                name: "amount".into(),
                description: "amount to add, defaults to 1".into(),
                required: false,
            },
        ])
    }

    async fn call(&self, args: Value, _ctx: &RequestContext) -> Result<String, ToolError> {
        let base = parse_int(args.get("value")).ok_or_else(|| ToolError::InvalidArgs {
            tool: self.name().to_string(),
            detail: "`value` must be an integer".into(),
        })?;
        let amount = args.get("amount").and_then(|v| parse_int(Some(v))).unwrap_or(1);
        Ok((base + amount).to_string())
    }
}

fn parse_int(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
