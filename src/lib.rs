//! Interlock: session-lock hand-off primitives for blocking on user input.
//!
//! # Overview
//!
//! Interlock implements a specific concurrency pattern: safely blocking a
//! worker thread on user input inside a UI event model where all session
//! state is serialized by a single reentrant lock. An event callback running
//! under the session lock may request user input and wait for the answer,
//! but the answer is produced by a *later* callback that itself needs the
//! same lock to run. Waiting naively therefore deadlocks the session.
//!
//! The crate provides the four pieces needed to do this correctly:
//!
//! - A reentrant lock with a queryable per-thread hold count that can be
//!   fully released and later restored to the exact same depth
//! - A condition signal bound to that lock for in-place suspension
//! - A one-shot result slot that resolves exactly once and wakes blocked
//!   readers
//! - A blocking-dialog orchestrator that records the caller's hold depth,
//!   releases every hold, parks on the slot, and reacquires the original
//!   depth before returning
//!
//! # Core Guarantees
//!
//! - **Exact depth restore**: `dialog::open_blocking` returns with the
//!   caller's hold count unchanged, on success, cancellation, and failure
//! - **Single resolution**: a [`ResultSlot`] transitions out of Pending at
//!   most once; racing resolvers get exactly one winner
//! - **No leaked waiters**: dismissing an interaction or closing the session
//!   always resolves outstanding slots, so parked threads always wake
//! - **Happens-before**: resolving a slot publishes all prior writes to the
//!   thread that resumes from `join`
//!
//! # Module Structure
//!
//! - [`sync`]: the reentrant session lock and its condition signal
//! - [`slot`]: the one-shot result slot
//! - [`session`]: the lock-guarded session container and its lifecycle
//! - [`runner`]: the UI task runner contract and a threaded implementation
//! - [`interaction`]: dialog handles and the presenter contract
//! - [`dialog`]: the release-all / join / reacquire orchestration
//! - [`policy`]: the four hand-off strategies, including the documented
//!   deadlock anti-pattern
//! - [`error`]: the wait and dispatch error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use interlock::{dialog, DialogRequest, InteractionSpec};
//!
//! // Inside an event callback, with the session lock held:
//! let name: String = dialog::open_blocking(
//!     &session,
//!     &presenter,
//!     DialogRequest::new(InteractionSpec::ask("What's your name?", "Name")),
//! )?;
//! // The lock is held again here, at the same depth as before the call.
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod dialog;
pub mod error;
pub mod interaction;
pub mod policy;
pub mod runner;
pub mod session;
pub mod slot;
pub mod sync;

pub use dialog::DialogRequest;
pub use error::{DispatchError, WaitError};
pub use interaction::{Interaction, InteractionId, InteractionKind, InteractionSpec, Presenter};
pub use policy::DispatchPolicy;
pub use runner::{CompletionTicket, ThreadedRunner, UiTaskRunner};
pub use session::{Session, SessionBound};
pub use slot::ResultSlot;
pub use sync::{ConditionSignal, SessionLock};
