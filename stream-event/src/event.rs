//! Protocol-level event types: one line of output from a running interaction, chain, or task.
//!
//! This is the wire shape only; the orchestrator crate constructs these from its internal
//! state machines and pushes them onto a channel for the transport layer to forward.

use serde::Serialize;
use serde_json::Value;

/// One event emitted while `interact`, `run_chain`, or `run_task` is in flight.
///
/// Matches the structure used throughout the engine: a `type` tag plus a type-specific
/// payload. Envelope fields (run id, sequence number) are injected separately so the
/// event types here stay free of bookkeeping concerns.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    /// A turn, chain, or task run started.
    RunStarted { label: String },
    /// Partial assistant text as it is produced by the inference driver.
    MessageChunk { content: String },
    /// A tool was dispatched with the given arguments.
    ToolCallStarted { name: String, args: Value },
    /// A tool finished; `is_error` distinguishes a `ToolError` text from a normal result.
    ToolCallFinished {
        name: String,
        result: String,
        is_error: bool,
    },
    /// One chain step completed with its response.
    ChainStepComplete { step_number: u32, response: String },
    /// One autonomous task iteration completed: task name and its result text.
    TaskIteration { task_name: String, result: String },
    /// Token usage for one inference call, when the provider reports it.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
    },
    /// A non-fatal error surfaced mid-run (e.g. a tool failure folded into the response).
    Warning { detail: String },
    /// The run ended in error (maps to one of the orchestrator's `ErrorKind`s).
    Failed { kind: String, detail: String },
    /// The run finished normally.
    Done,
    /// The run was cancelled via the caller's cancellation token.
    Cancelled,
}

impl OutputEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
