//! Synchronization primitives for the session lock hand-off.
//!
//! [`SessionLock`] is a reentrant mutual-exclusion lock with an explicit,
//! queryable hold count, supporting full release and exact-depth restore of
//! the current thread's holds. [`ConditionSignal`] is a wait/notify
//! primitive bound to one such lock, used to suspend a thread in place
//! while the lock is handed to the code that will produce its answer.

pub mod condition;
pub mod reentrant;

pub use condition::ConditionSignal;
pub use reentrant::SessionLock;
