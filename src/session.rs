//! Lock-guarded session container and lifecycle.
//!
//! A [`Session`] owns per-client state and the single [`SessionLock`]
//! serializing every read and write of it. State is only reachable through
//! [`Session::with_state`], which asserts the caller holds the lock, so
//! the "no field may be touched without the lock" invariant is enforced at
//! the access point rather than by convention.
//!
//! The session also tracks its open interactions. Closing the session
//! resolves every still-pending one with [`WaitError::SessionClosed`],
//! firing its resolution hook and closing its presenter, so a thread
//! parked on an answer is never leaked when the conversation disappears.
//!
//! [`WaitError::SessionClosed`]: crate::error::WaitError::SessionClosed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::slot::ResultSlot;
use crate::sync::reentrant::HeldLock;
use crate::sync::SessionLock;

/// A pending artifact that a closing session must resolve. Type-erased so
/// the registry can hold artifacts of different value types.
///
/// Implemented by [`ResultSlot`] for bare slots and by
/// [`Interaction`](crate::interaction::Interaction) for open dialogs, whose
/// teardown also fires the resolution hook and closes the presenter.
pub trait SessionBound: Send + Sync {
    /// Resolves the artifact as session-closed if still pending; returns
    /// whether this call resolved it.
    fn abort_for_close(&self) -> bool;
}

impl<T: Send> SessionBound for ResultSlot<T> {
    fn abort_for_close(&self) -> bool {
        self.fail_closed()
    }
}

/// Per-client state protected by one reentrant session lock.
///
/// Created on client attach, closed on detach or timeout. The lock's hold
/// count must be zero by the time the session is dropped.
#[derive(Debug)]
pub struct Session<S> {
    lock: Arc<SessionLock>,
    state: RwLock<S>,
    closed: AtomicBool,
    pending: Mutex<Vec<Weak<dyn SessionBound>>>,
}

impl<S> Session<S> {
    /// Creates a new, open session around the given state.
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            lock: Arc::new(SessionLock::new()),
            state: RwLock::new(state),
            closed: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The session's lock. All state access and every UI callback for this
    /// session must run while holding it.
    #[must_use]
    pub fn lock(&self) -> &Arc<SessionLock> {
        &self.lock
    }

    /// Runs `f` with mutable access to the session state.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the session lock.
    /// Touching session state without the lock is a programming error.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        assert!(
            self.lock.is_held_by_current_thread(),
            "Session::with_state requires the session lock"
        );
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Returns true if the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Registers an artifact for teardown when the session closes.
    ///
    /// If the session is already closed the artifact is resolved as
    /// session-closed immediately, so no caller can park on it forever.
    /// The registry holds weak references only; keep the artifact alive
    /// for as long as an answer is outstanding.
    pub fn track<B: SessionBound + 'static>(&self, bound: &Arc<B>) {
        let bound: Arc<dyn SessionBound> = Arc::clone(bound) as Arc<dyn SessionBound>;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // The closed flag only flips while this mutex is held, so the check
        // and the push cannot interleave with a concurrent close.
        if self.closed.load(Ordering::Acquire) {
            drop(pending);
            bound.abort_for_close();
            return;
        }
        pending.retain(|weak| weak.strong_count() > 0);
        pending.push(Arc::downgrade(&bound));
    }

    /// Closes the session, resolving every still-pending tracked artifact
    /// with a session-closed failure.
    ///
    /// Teardown runs with the session lock held, so resolution hooks see
    /// the same locking discipline as ordinary callbacks. Idempotent: only
    /// the first call drains the registry.
    pub fn close(&self) {
        let drained = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *pending)
        };
        let _held = HeldLock::acquire(&self.lock);
        let mut aborted = 0usize;
        for weak in drained {
            if let Some(bound) = weak.upgrade() {
                if bound.abort_for_close() {
                    aborted += 1;
                }
            }
        }
        tracing::debug!(aborted, "session closed; pending interactions resolved");
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                !self.lock.is_locked(),
                "session dropped while its lock is still held"
            );
        }
    }
}
