//! Error types for blocking waits and task dispatch.
//!
//! The taxonomy separates three outcomes a blocked caller must be able to
//! tell apart:
//!
//! - **Cancellation**: the user dismissed the interaction. Expected, not a
//!   defect.
//! - **Session closed**: the conversation disappeared while the caller was
//!   parked. Distinct from cancellation so callers can tell "user said no"
//!   from "nobody is there to answer".
//! - **Failure**: the resolving side recorded an error.
//!
//! Lock misuse (unlocking without holding, blocking with zero holds) is a
//! programming error, not a runtime failure; those paths panic and are
//! documented under `# Panics` at each call site.

/// Terminal outcome of a blocking wait that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// The user dismissed the interaction without answering.
    #[error("interaction was dismissed by the user")]
    Cancelled,
    /// The session was closed while the interaction was outstanding.
    #[error("session was closed while the interaction was outstanding")]
    SessionClosed,
    /// The resolving side recorded a failure.
    #[error("interaction failed: {0}")]
    Failed(String),
}

impl WaitError {
    /// Returns true if this outcome is a user cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error returned when a task cannot be scheduled onto a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The session is closed; the task was dropped without running.
    #[error("session is closed; task dropped")]
    SessionClosed,
    /// The runner's worker thread has shut down.
    #[error("task runner has shut down")]
    RunnerStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_error_display() {
        assert_eq!(
            WaitError::Cancelled.to_string(),
            "interaction was dismissed by the user"
        );
        assert_eq!(
            WaitError::SessionClosed.to_string(),
            "session was closed while the interaction was outstanding"
        );
        assert_eq!(
            WaitError::Failed("bad input".into()).to_string(),
            "interaction failed: bad input"
        );
    }

    #[test]
    fn dispatch_error_display() {
        assert_eq!(
            DispatchError::SessionClosed.to_string(),
            "session is closed; task dropped"
        );
        assert_eq!(
            DispatchError::RunnerStopped.to_string(),
            "task runner has shut down"
        );
    }

    #[test]
    fn is_cancelled() {
        assert!(WaitError::Cancelled.is_cancelled());
        assert!(!WaitError::SessionClosed.is_cancelled());
        assert!(!WaitError::Failed(String::new()).is_cancelled());
    }
}
