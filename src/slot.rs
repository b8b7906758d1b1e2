//! One-shot result slot.
//!
//! [`ResultSlot`] is a single-assignment cell for the answer of a pending
//! interaction. Exactly one of `complete`, `cancel`, or `fail` wins; later
//! resolution attempts are no-ops that report `false`. Readers may poll
//! with [`ResultSlot::try_get`] or block in [`ResultSlot::join`] until the
//! slot becomes terminal.
//!
//! ```text
//!              complete(v) ──► Completed(v)
//!             /
//!   Pending ────  cancel()  ──► Cancelled
//!             \
//!              fail(e)     ──► Failed(e)
//! ```
//!
//! Terminal states are immutable. Every thread blocked in `join` is woken
//! exactly once when the slot resolves, and resolution happens-before the
//! corresponding `join` return, so all writes made by the resolver are
//! visible to the resumed thread.
//!
//! # Example
//!
//! ```ignore
//! let slot = Arc::new(ResultSlot::<String>::new());
//!
//! // Resolver thread, later:
//! slot.complete("Ada".to_string());
//!
//! // Waiting thread:
//! let name = slot.join()?;   // "Ada"
//! ```

use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::WaitError;

#[derive(Debug)]
enum SlotState<T> {
    Pending,
    Resolved(Result<T, WaitError>),
}

/// A single-assignment, blocking-readable result cell.
///
/// `T: Clone` is required by the reading operations because multiple
/// threads may each observe the one terminal outcome.
#[derive(Debug)]
pub struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
    resolved: Condvar,
}

impl<T> ResultSlot<T> {
    /// Creates a new slot in the Pending state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            resolved: Condvar::new(),
        }
    }

    fn resolve(&self, outcome: Result<T, WaitError>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            SlotState::Pending => {
                *state = SlotState::Resolved(outcome);
                drop(state);
                self.resolved.notify_all();
                true
            }
            SlotState::Resolved(_) => false,
        }
    }

    /// Resolves the slot with a value. First resolution wins; returns
    /// whether this call was the winner.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Resolves the slot as cancelled by the user. First resolution wins;
    /// returns whether this call was the winner.
    pub fn cancel(&self) -> bool {
        self.resolve(Err(WaitError::Cancelled))
    }

    /// Resolves the slot with a failure message. First resolution wins;
    /// returns whether this call was the winner.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.resolve(Err(WaitError::Failed(reason.into())))
    }

    /// Resolves the slot as abandoned because its session closed. First
    /// resolution wins; returns whether this call was the winner.
    pub fn fail_closed(&self) -> bool {
        self.resolve(Err(WaitError::SessionClosed))
    }

    /// Returns true if the slot has not yet resolved.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            SlotState::Pending
        )
    }

    /// Returns true if the slot has resolved to any terminal state.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.is_pending()
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Polls the slot without blocking.
    ///
    /// Returns `None` while Pending, otherwise a copy of the terminal
    /// outcome.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<T, WaitError>> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Pending => None,
            SlotState::Resolved(outcome) => Some(outcome.clone()),
        }
    }

    /// Blocks the calling thread until the slot resolves, then returns the
    /// terminal outcome.
    ///
    /// Works from any thread, including ones other than the resolver. The
    /// wait is unbounded; deadlines are an extension point, not part of
    /// this contract.
    pub fn join(&self) -> Result<T, WaitError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*state {
                SlotState::Pending => {
                    state = self
                        .resolved
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                SlotState::Resolved(outcome) => return outcome.clone(),
            }
        }
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
