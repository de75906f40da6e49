//! Explicit call context threaded through every operation.
//!
//! Nothing in this crate reaches for a process-wide default client, db handle, or
//! session. Every entry point takes a [`RequestContext`] instead.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Identity of the caller making a request. Ownership checks compare against this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-call context: caller identity and a cooperative cancellation token.
///
/// Cloning is cheap; the cancellation token is shared (cancelling one clone cancels
/// every clone derived from it).
#[derive(Clone)]
pub struct RequestContext {
    pub user: UserId,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a context from an existing cancellation token (e.g. one owned by a
    /// supervising Task Monitor sweep so every impersonated run it dispatches can be
    /// cancelled together).
    pub fn with_cancellation(user: UserId, cancel: CancellationToken) -> Self {
        Self { user, cancel }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Derives a child context for a nested operation (e.g. a chain step, or a sub-chain
    /// recursion) that should observe the same cancellation but is otherwise independent.
    pub fn child(&self) -> Self {
        Self {
            user: self.user.clone(),
            cancel: self.cancel.child_token(),
        }
    }
}

/// Thin alias used at call sites that only need to request cancellation, without pulling
/// in the rest of [`RequestContext`] (e.g. a transport layer holding a handle per request).
pub type Cancellation = Arc<CancellationToken>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_token_is_cancelled_by_parent() {
        let ctx = RequestContext::new(UserId("u1".into()));
        let child = ctx.child();
        assert!(!child.is_cancelled());
        ctx.cancellation_token().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn cancelling_child_does_not_cancel_parent() {
        let ctx = RequestContext::new(UserId("u1".into()));
        let child = ctx.child();
        child.cancellation_token().cancel();
        assert!(!ctx.is_cancelled());
    }
}
