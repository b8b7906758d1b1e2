//! Interactions: transient requests for user input that resolve once.
//!
//! An [`Interaction`] pairs a presented dialog with the [`ResultSlot`] its
//! answer lands in. The crate calls [`Presenter::open`]; the UI plumbing
//! calls back [`Interaction::confirm`] or [`Interaction::dismiss`] exactly
//! once per handle. Whichever path fires, the slot resolves at most once
//! and the dialog closes exactly once.
//!
//! A confirm may carry a validator. Invalid input does not resolve the
//! slot: the presenter is told to show the error inline, the dialog stays
//! open, and only a subsequent valid confirm (or a dismiss) resolves it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::session::SessionBound;
use crate::slot::ResultSlot;

/// Opaque handle for a presented dialog, allocated by the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionId(u64);

impl InteractionId {
    /// Wraps a presenter-allocated raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The shape of dialog being requested. Presentation hint only; the
/// resolution protocol is identical for all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// Free-form input (a text field with a confirm button).
    Input,
    /// A yes/no decision.
    YesNo,
    /// An acknowledgement with a single dismiss/OK button.
    Acknowledge,
}

/// What to present: a title, a prompt, and the dialog shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionSpec {
    /// Dialog title.
    pub title: String,
    /// Prompt or message shown in the dialog body.
    pub prompt: String,
    /// Dialog shape.
    pub kind: InteractionKind,
}

impl InteractionSpec {
    /// A free-form input dialog.
    #[must_use]
    pub fn ask(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            kind: InteractionKind::Input,
        }
    }

    /// A yes/no confirmation dialog.
    #[must_use]
    pub fn confirm(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            kind: InteractionKind::YesNo,
        }
    }

    /// An acknowledge-only alert dialog.
    #[must_use]
    pub fn alert(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            kind: InteractionKind::Acknowledge,
        }
    }
}

/// Presentation contract, provided by the UI plumbing.
///
/// The crate calls [`Presenter::open`] and [`Presenter::close`]; the
/// plumbing routes the user's confirm/dismiss gestures back to the
/// [`Interaction`] it got from the open call.
pub trait Presenter<T>: Send + Sync {
    /// Presents the dialog and returns its handle.
    fn open(&self, spec: &InteractionSpec) -> InteractionId;

    /// Tears the dialog down. Called exactly once per handle.
    fn close(&self, handle: InteractionId);

    /// Shows an inline validation error; the dialog stays open.
    fn reject(&self, handle: InteractionId, reason: &str) {
        let _ = (handle, reason);
    }
}

/// Validates a confirmed value before it may resolve the slot.
pub type Validator<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// Hook invoked after the slot resolves, on the resolving thread, while it
/// still holds the session lock. Used by the condition-signal hand-off
/// strategy.
pub type ResolvedHook = Box<dyn Fn() + Send + Sync>;

/// An open dialog owning the one slot its answer resolves.
pub struct Interaction<T> {
    handle: InteractionId,
    slot: Arc<ResultSlot<T>>,
    presenter: Arc<dyn Presenter<T>>,
    validator: Option<Validator<T>>,
    on_resolved: Option<ResolvedHook>,
    closed: AtomicBool,
}

impl<T> Interaction<T> {
    /// Presents `spec` and returns the open interaction.
    #[must_use]
    pub fn open(
        presenter: Arc<dyn Presenter<T>>,
        spec: &InteractionSpec,
        validator: Option<Validator<T>>,
        on_resolved: Option<ResolvedHook>,
    ) -> Arc<Self> {
        let handle = presenter.open(spec);
        tracing::debug!(handle = handle.raw(), title = %spec.title, "interaction opened");
        Arc::new(Self {
            handle,
            slot: Arc::new(ResultSlot::new()),
            presenter,
            validator,
            on_resolved,
            closed: AtomicBool::new(false),
        })
    }

    /// The presenter handle of this dialog.
    #[must_use]
    pub fn handle(&self) -> InteractionId {
        self.handle
    }

    /// The slot the user's answer will resolve.
    #[must_use]
    pub fn slot(&self) -> &Arc<ResultSlot<T>> {
        &self.slot
    }

    /// Callback for the user confirming with `value`.
    ///
    /// If a validator is attached and rejects the value, the slot stays
    /// Pending and the dialog stays open, with the rejection reason shown
    /// inline. Otherwise the slot resolves (first resolution wins) and the
    /// dialog closes.
    pub fn confirm(&self, value: T) {
        if let Some(validate) = &self.validator {
            if let Err(reason) = validate(&value) {
                tracing::debug!(handle = self.handle.raw(), %reason, "confirm rejected");
                self.presenter.reject(self.handle, &reason);
                return;
            }
        }
        if self.slot.complete(value) {
            self.notify_resolved();
        }
        self.close_once();
    }

    /// Callback for the user dismissing the dialog without answering.
    ///
    /// Resolves the slot as cancelled (first resolution wins) and closes
    /// the dialog.
    pub fn dismiss(&self) {
        if self.slot.cancel() {
            self.notify_resolved();
        }
        self.close_once();
    }

    fn notify_resolved(&self) {
        if let Some(hook) = &self.on_resolved {
            hook();
        }
    }

    fn close_once(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.presenter.close(self.handle);
        }
    }
}

impl<T: Send> SessionBound for Interaction<T> {
    /// Session teardown takes the same path as a dismiss: the slot resolves
    /// (as session-closed), the resolution hook fires so parked condition
    /// waiters are signalled, and the dialog closes.
    fn abort_for_close(&self) -> bool {
        let resolved = self.slot.fail_closed();
        if resolved {
            self.notify_resolved();
        }
        self.close_once();
        resolved
    }
}

impl<T> std::fmt::Debug for Interaction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("handle", &self.handle)
            .field("pending", &self.slot.is_pending())
            .finish_non_exhaustive()
    }
}
