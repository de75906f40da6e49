//! Error taxonomy returned by the core, mapped to transport errors at the boundary.
//!
//! Every public call returns a `Result<T, OrchestratorError>`. `kind()` exposes the
//! taxonomy tag so a transport layer can map it to a status code without matching on
//! the `Display` text.

use thiserror::Error;

/// Stable tag for an [`OrchestratorError`], independent of the human-readable detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    InvalidInput,
    BudgetExceeded,
    UpstreamFailure,
    ToolError,
    MissingDependency,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::BudgetExceeded => "budget_exceeded",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::ToolError => "tool_error",
            ErrorKind::MissingDependency => "missing_dependency",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Kind of tool failure, distinguished so callers can decide whether to retry.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments for tool {tool}: {detail}")]
    InvalidArgs { tool: String, detail: String },
    #[error("tool {tool} failed: {detail}")]
    HandlerFailure { tool: String, detail: String },
    #[error("tool {tool} timed out")]
    Timeout { tool: String },
}

impl ToolError {
    /// Name of the tool this error concerns, for logging.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound(name) => name,
            ToolError::InvalidArgs { tool, .. } => tool,
            ToolError::HandlerFailure { tool, .. } => tool,
            ToolError::Timeout { tool } => tool,
        }
    }
}

/// The error type returned by every public core operation.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("cancelled")]
    Cancelled,
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            OrchestratorError::InvalidInput(_) => ErrorKind::InvalidInput,
            OrchestratorError::BudgetExceeded(_) => ErrorKind::BudgetExceeded,
            OrchestratorError::UpstreamFailure(_) => ErrorKind::UpstreamFailure,
            OrchestratorError::Tool(_) => ErrorKind::ToolError,
            OrchestratorError::MissingDependency(_) => ErrorKind::MissingDependency,
            OrchestratorError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Human-readable detail, without the `kind` prefix `Display` adds.
    pub fn detail(&self) -> String {
        match self {
            OrchestratorError::NotFound(d)
            | OrchestratorError::PermissionDenied(d)
            | OrchestratorError::InvalidInput(d)
            | OrchestratorError::BudgetExceeded(d)
            | OrchestratorError::UpstreamFailure(d)
            | OrchestratorError::MissingDependency(d) => d.clone(),
            OrchestratorError::Tool(e) => e.to_string(),
            OrchestratorError::Cancelled => "cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_tool_errors_to_tool_error_kind() {
        let err = OrchestratorError::Tool(ToolError::NotFound("echo".into()));
        assert_eq!(err.kind(), ErrorKind::ToolError);
    }

    #[test]
    fn kind_as_str_is_stable() {
        assert_eq!(ErrorKind::BudgetExceeded.as_str(), "budget_exceeded");
        assert_eq!(ErrorKind::Cancelled.as_str(), "cancelled");
    }
}
