//! Reentrant session lock with an explicit hold count.
//!
//! The lock serializes all access to a session's state. It is reentrant:
//! the owning thread may acquire it again without blocking itself, tracked
//! by a hold count. What makes it more than a plain recursive mutex is the
//! hand-off surface: [`SessionLock::release_all`] drops every hold the
//! current thread has and reports the depth, and
//! [`SessionLock::reacquire`] restores exactly that depth later. This is
//! the mechanism that lets a thread park on a pending user answer while the
//! callback producing that answer runs under the same lock.
//!
//! # Fairness
//!
//! Unspecified. When the count reaches zero one waiter is woken; which one
//! is implementation-defined and no starvation guarantee is made.
//!
//! # Memory ordering
//!
//! A release (count reaching zero) happens-before the subsequent acquire by
//! any other thread; all session-state writes made under the lock are
//! visible to the next owner.
//!
//! # Example
//!
//! ```ignore
//! let lock = Arc::new(SessionLock::new());
//!
//! lock.lock();
//! lock.lock();                       // reentrant, hold count 2
//! let depth = lock.release_all();    // fully released, depth == 2
//! // ... another thread may acquire here ...
//! lock.reacquire(depth);             // hold count 2 again
//! lock.unlock();
//! lock.unlock();
//! ```

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use super::condition::ConditionSignal;

/// Owner and depth of the lock. `owner` is `None` exactly when `holds == 0`.
#[derive(Debug)]
struct LockState {
    owner: Option<ThreadId>,
    holds: usize,
}

/// A reentrant mutual-exclusion lock with a queryable hold count.
///
/// At most one thread owns the lock at a time; the owner may acquire it
/// recursively. Any thread may act as the session owner as long as it holds
/// the lock; there is no dedicated owner thread.
#[derive(Debug)]
pub struct SessionLock {
    state: Mutex<LockState>,
    available: Condvar,
}

impl SessionLock {
    /// Creates a new, unowned lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                owner: None,
                holds: 0,
            }),
            available: Condvar::new(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// If the calling thread already owns the lock, the hold count is
    /// incremented and the call returns immediately.
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.holds = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.holds += 1;
                    return;
                }
                Some(_) => {
                    state = self
                        .available
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Acquires the lock without blocking.
    ///
    /// Returns true if the lock was acquired (or the caller already owned
    /// it and the count was incremented).
    #[must_use]
    pub fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.holds = 1;
                true
            }
            Some(owner) if owner == me => {
                state.holds += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Releases one hold of the lock.
    ///
    /// When the count reaches zero the lock becomes available and one
    /// waiter, if any, is woken.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not own the lock. Unlocking a lock
    /// you do not hold is a programming error, not a recoverable condition.
    pub fn unlock(&self) {
        let me = thread::current().id();
        let mut state = self.state();
        assert_eq!(
            state.owner,
            Some(me),
            "SessionLock::unlock called by a thread that does not own the lock"
        );
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            drop(state);
            self.available.notify_one();
        }
    }

    /// Returns the calling thread's hold count, or 0 if it is not the owner.
    #[must_use]
    pub fn hold_count(&self) -> usize {
        let me = thread::current().id();
        let state = self.state();
        if state.owner == Some(me) {
            state.holds
        } else {
            0
        }
    }

    /// Returns true if the calling thread owns the lock.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.hold_count() > 0
    }

    /// Returns true if any thread owns the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state().owner.is_some()
    }

    /// Releases every hold the calling thread has and returns the depth.
    ///
    /// After this call the lock is fully available to other threads. The
    /// returned depth must later be passed to [`SessionLock::reacquire`] to
    /// restore the caller's ownership at the same depth.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not own the lock.
    pub fn release_all(&self) -> usize {
        let me = thread::current().id();
        let mut state = self.state();
        assert_eq!(
            state.owner,
            Some(me),
            "SessionLock::release_all called by a thread that does not own the lock"
        );
        let depth = state.holds;
        state.owner = None;
        state.holds = 0;
        drop(state);
        tracing::trace!(depth, "session lock fully released for hand-off");
        self.available.notify_one();
        depth
    }

    /// Reacquires the lock at the given depth, blocking until available.
    ///
    /// This is the restore half of the hand-off protocol: a thread that
    /// released N holds via [`SessionLock::release_all`] calls
    /// `reacquire(N)` to get back to exactly where it was.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    pub fn reacquire(&self, depth: usize) {
        assert!(depth > 0, "SessionLock::reacquire requires a positive depth");
        let me = thread::current().id();
        let mut state = self.state();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.holds = depth;
                    break;
                }
                Some(owner) if owner == me => {
                    state.holds += depth;
                    break;
                }
                Some(_) => {
                    state = self
                        .available
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        drop(state);
        tracing::trace!(depth, "session lock reacquired after hand-off");
    }

    /// Creates a condition signal bound to this lock.
    ///
    /// The signal may only be used by threads currently holding the lock.
    #[must_use]
    pub fn new_condition(self: &Arc<Self>) -> ConditionSignal {
        ConditionSignal::new(Arc::clone(self))
    }
}

impl Default for SessionLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the session lock for a scope, releasing on drop even if the
/// guarded code panics, so a misbehaving callback cannot wedge the whole
/// session.
pub(crate) struct HeldLock<'a> {
    lock: &'a SessionLock,
}

impl<'a> HeldLock<'a> {
    pub(crate) fn acquire(lock: &'a SessionLock) -> Self {
        lock.lock();
        Self { lock }
    }
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
