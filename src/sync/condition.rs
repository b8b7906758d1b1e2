//! Condition signal bound to a session lock.
//!
//! [`ConditionSignal`] suspends a thread that currently owns the session
//! lock, releasing the lock's full hold depth for the duration of the wait
//! and restoring it on wake. This lets a callback that is already running
//! under the lock park in place until a later callback, re-entering the
//! lock, produces the answer and signals.
//!
//! # Signal semantics
//!
//! - [`ConditionSignal::signal`] wakes at most one waiter. If no thread is
//!   waiting the signal is lost; nothing is buffered.
//! - [`ConditionSignal::await_uninterruptibly`] never returns before a
//!   signal arrives. Spurious wakeups of the underlying primitive are
//!   absorbed.
//! - A waiter registers itself before releasing the session lock, so a
//!   signal sent from any thread after the release is always delivered.
//!   Delivery does not depend on which thread the signaller runs on.
//!
//! # Example
//!
//! ```ignore
//! // On a worker thread, with the session lock held:
//! let condition = Arc::new(lock.new_condition());
//! open_dialog_that_signals_on_answer(Arc::clone(&condition));
//! condition.await_uninterruptibly();   // lock released while parked
//! // Lock held again at the original depth; the answer is ready.
//! ```

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::reentrant::SessionLock;

#[derive(Debug)]
struct CondState {
    /// Threads currently parked in `await_uninterruptibly`.
    waiters: usize,
    /// Delivered but not yet consumed wake tokens. Never exceeds `waiters`.
    wakes: usize,
}

/// A wait/notify primitive bound to exactly one [`SessionLock`].
///
/// Both waiting and signalling require the calling thread to hold the
/// bound lock.
#[derive(Debug)]
pub struct ConditionSignal {
    lock: Arc<SessionLock>,
    state: Mutex<CondState>,
    wake: Condvar,
}

impl ConditionSignal {
    pub(crate) fn new(lock: Arc<SessionLock>) -> Self {
        Self {
            lock,
            state: Mutex::new(CondState {
                waiters: 0,
                wakes: 0,
            }),
            wake: Condvar::new(),
        }
    }

    /// The lock this condition is bound to.
    #[must_use]
    pub fn lock(&self) -> &Arc<SessionLock> {
        &self.lock
    }

    /// Releases the bound lock's full depth, parks until signalled, then
    /// reacquires the exact prior depth.
    ///
    /// The wait is uninterruptible: it only ends when another thread calls
    /// [`ConditionSignal::signal`]. Registration happens before the lock is
    /// released, so a signaller that acquires the lock after this thread
    /// parks cannot race past the wait.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the bound lock.
    pub fn await_uninterruptibly(&self) {
        assert!(
            self.lock.is_held_by_current_thread(),
            "ConditionSignal::await_uninterruptibly requires the session lock"
        );

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.waiters += 1;
        // Registered: release the session lock so the signalling callback
        // can run. The condition's own mutex stays held across the release,
        // closing the window between unlock and park.
        let depth = self.lock.release_all();
        while state.wakes == 0 {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.wakes -= 1;
        state.waiters -= 1;
        drop(state);

        self.lock.reacquire(depth);
    }

    /// Wakes at most one parked waiter.
    ///
    /// If no thread is waiting, the signal is lost.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the bound lock.
    pub fn signal(&self) {
        assert!(
            self.lock.is_held_by_current_thread(),
            "ConditionSignal::signal requires the session lock"
        );
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.wakes < state.waiters {
            state.wakes += 1;
            drop(state);
            self.wake.notify_all();
        }
    }

    /// Number of threads currently parked on this condition.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
    }
}
