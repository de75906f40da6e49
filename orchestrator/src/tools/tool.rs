//! Tool trait: a single callable handler addressable from an LLM response or a chain step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::ToolError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgsSchema {
    pub args: Vec<ArgSpec>,
}

impl ArgsSchema {
    pub fn new(args: Vec<ArgSpec>) -> Self {
        Self { args }
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.args.iter().filter(|a| a.required).map(|a| a.name.as_str()).collect()
    }

    pub fn known_names(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.name.as_str()).collect()
    }

    /// Renders `(arg_schema)` text for a tool description line, e.g. `(text, count?)`.
    pub fn render(&self) -> String {
        self.args
            .iter()
            .map(|a| if a.required { a.name.clone() } else { format!("{}?", a.name) })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A callable handler addressable from an LLM response or a chain step.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn friendly_name(&self) -> &str;
    fn args_schema(&self) -> ArgsSchema;

    async fn call(&self, args: Value, ctx: &RequestContext) -> Result<String, ToolError>;
}
