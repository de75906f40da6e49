//! Tool Registry & Executor: enumerates enabled tools and dispatches calls to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::context::RequestContext;
use crate::domain::Agent;
use crate::error::ToolError;
use crate::tools::tool::Tool;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Declarative registry built once at process start; each tool's schema is static data
/// rather than discovered by scanning a filesystem.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    friendly_index: HashMap<String, String>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            friendly_index: HashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.friendly_index.insert(tool.friendly_name().to_string(), tool.name().to_string());
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tools enabled on `agent`, in no particular order.
    pub fn enabled_tools(&self, agent: &Agent) -> Vec<Arc<dyn Tool>> {
        agent
            .enabled_command_names()
            .into_iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    /// Renders the `{COMMANDS}` block: one `"<friendly_name> - <name>(<arg_schema>)"` line
    /// per enabled tool, or `"No commands."` when none are enabled.
    pub fn render_command_block(&self, agent: &Agent) -> String {
        let tools = self.enabled_tools(agent);
        if tools.is_empty() {
            return "No commands.".to_string();
        }
        tools
            .iter()
            .map(|t| format!("{} - {}({})", t.friendly_name(), t.name(), t.args_schema().render()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn resolve(&self, tool_name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        if let Some(tool) = self.tools.get(tool_name) {
            return Ok(tool.clone());
        }
        if let Some(name) = self.friendly_index.get(tool_name) {
            if let Some(tool) = self.tools.get(name) {
                return Ok(tool.clone());
            }
        }
        Err(ToolError::NotFound(tool_name.to_string()))
    }

    /// Validates `args` against the schema: every required key must be present; unknown
    /// keys are dropped with a warning rather than rejected.
    fn validate_args(tool: &Arc<dyn Tool>, mut args: Value) -> Result<Value, ToolError> {
        let schema = tool.args_schema();
        let obj = args.as_object_mut().ok_or_else(|| ToolError::InvalidArgs {
            tool: tool.name().to_string(),
            detail: "arguments must be a JSON object".to_string(),
        })?;

        for required in schema.required_names() {
            if !obj.contains_key(required) {
                return Err(ToolError::InvalidArgs {
                    tool: tool.name().to_string(),
                    detail: format!("missing required argument `{required}`"),
                });
            }
        }

        let known: Vec<String> = schema.known_names().into_iter().map(String::from).collect();
        let unknown: Vec<String> = obj.keys().filter(|k| !known.contains(k)).cloned().collect();
        for key in &unknown {
            warn!(tool = tool.name(), arg = key, "dropping unknown tool argument");
            obj.remove(key);
        }

        Ok(args)
    }

    /// Resolves `tool_name` (by `name` or `friendly_name`, preferring `name` on
    /// ambiguity), validates `args`, and invokes the handler with a deadline. No retry
    /// happens here — the Interaction Loop decides retry policy.
    pub async fn execute(&self, tool_name: &str, args: Value, ctx: &RequestContext) -> Result<String, ToolError> {
        let tool = self.resolve(tool_name)?;
        let args = Self::validate_args(&tool, args)?;

        match tokio::time::timeout(self.timeout, tool.call(args, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout { tool: tool.name().to_string() }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
