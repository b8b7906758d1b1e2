//! Blocking dialogs: the release-all / join / reacquire orchestration.
//!
//! [`open_async`] presents a dialog and returns immediately with the
//! pending interaction; a later user gesture resolves its slot.
//! [`open_blocking`] is the same followed by a lock-releasing wait:
//!
//! 1. record the caller's hold count H (must be >= 1)
//! 2. release all H holds, so the callback that will resolve this very
//!    dialog can acquire the lock and run
//! 3. block in [`ResultSlot::join`] until the slot resolves
//! 4. reacquire exactly H holds, then return the value or propagate the
//!    stored cancellation/failure
//!
//! The depth is captured per call on the stack, so nested blocking dialogs
//! (one opened from inside the resolution callback of another) each
//! restore their own depth independently.
//!
//! Waits are unbounded; a deadline parameter is a production-hardening
//! extension point, not part of this contract.
//!
//! # Example
//!
//! ```ignore
//! // Inside an event callback, session lock held at some depth:
//! let answer: String = dialog::open_blocking(
//!     &session,
//!     &presenter,
//!     DialogRequest::new(InteractionSpec::ask("Name", "What's your name?")),
//! )?;
//! ```

use std::sync::Arc;

use crate::error::WaitError;
use crate::interaction::{
    Interaction, InteractionSpec, Presenter, ResolvedHook, Validator,
};
use crate::session::Session;
use crate::slot::ResultSlot;

/// What to open: a spec plus optional validation and resolution hooks.
pub struct DialogRequest<T> {
    spec: InteractionSpec,
    validator: Option<Validator<T>>,
    on_resolved: Option<ResolvedHook>,
}

impl<T> DialogRequest<T> {
    /// A plain request with no validator or hook.
    #[must_use]
    pub fn new(spec: InteractionSpec) -> Self {
        Self {
            spec,
            validator: None,
            on_resolved: None,
        }
    }

    /// Attaches a validator; confirms carrying invalid values keep the
    /// dialog open instead of resolving the slot.
    #[must_use]
    pub fn validate(
        mut self,
        validator: impl Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Attaches a hook run on the resolving thread, under the session
    /// lock, right after the slot resolves. The condition-signal hand-off
    /// strategy uses this to signal its waiter.
    #[must_use]
    pub fn on_resolved(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_resolved = Some(Box::new(hook));
        self
    }
}

/// Opens a dialog and returns the pending interaction immediately.
///
/// The interaction is tracked by the session: closing the session resolves
/// its slot as session-closed, fires its resolution hook, and closes the
/// presented dialog, so no waiter leaks. The session holds only a weak
/// reference; keep the interaction alive while an answer is outstanding
/// (the UI plumbing does, to route gestures back to it).
pub fn open_async<S, T: Send + 'static>(
    session: &Session<S>,
    presenter: &Arc<dyn Presenter<T>>,
    request: DialogRequest<T>,
) -> Arc<Interaction<T>> {
    let interaction = Interaction::open(
        Arc::clone(presenter),
        &request.spec,
        request.validator,
        request.on_resolved,
    );
    session.track(&interaction);
    interaction
}

/// Opens a dialog and blocks the calling thread until it resolves,
/// releasing the caller's full lock depth for the duration of the wait and
/// restoring it before returning.
///
/// Returns the confirmed value, or the stored cancellation/failure. On
/// every exit path the caller's hold count equals its pre-call value.
///
/// # Panics
///
/// Panics if the calling thread does not hold the session lock. Blocking
/// with zero holds is a contract violation: the release/restore protocol
/// would be meaningless and the wait would belong to strategy four
/// (no lock held) instead.
pub fn open_blocking<S, T: Clone + Send + 'static>(
    session: &Session<S>,
    presenter: &Arc<dyn Presenter<T>>,
    request: DialogRequest<T>,
) -> Result<T, WaitError> {
    let lock = session.lock();
    assert!(
        lock.is_held_by_current_thread(),
        "dialog::open_blocking requires the session lock to be held"
    );

    let interaction = open_async(session, presenter, request);
    let slot = Arc::clone(interaction.slot());
    block_on(session, &slot)
}

/// The lock-releasing wait on an already-open slot.
///
/// Exposed separately so callers that opened asynchronously can decide to
/// block later. Same contract as [`open_blocking`]: the session lock must
/// be held, and the hold count is restored on every exit path.
///
/// # Panics
///
/// Panics if the calling thread does not hold the session lock.
pub fn block_on<S, T: Clone>(session: &Session<S>, slot: &ResultSlot<T>) -> Result<T, WaitError> {
    let lock = session.lock();
    assert!(
        lock.is_held_by_current_thread(),
        "dialog::block_on requires the session lock to be held"
    );

    let depth = lock.release_all();
    tracing::trace!(depth, "parked waiting for interaction");
    let outcome = slot.join();
    lock.reacquire(depth);
    tracing::trace!(
        depth,
        resolved_ok = outcome.is_ok(),
        "resumed after interaction"
    );
    outcome
}
