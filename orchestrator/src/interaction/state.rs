//! The state machine one user turn moves through.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Received,
    ComposingPrompt,
    Inferring,
    ToolDispatch,
    Validating,
    Persisting,
    Done,
    Cancelled,
}
