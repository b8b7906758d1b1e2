//! The four hand-off strategies for blocking on user input.
//!
//! Each strategy is a different answer to the same question: a flow wants
//! to park until a dialog resolves, but the callback resolving the dialog
//! needs the session lock. They are alternative designs for one contract,
//! kept side by side so the trade-offs stay explicit and testable:
//!
//! - [`DispatchPolicy::HoldAndWait`] — **broken by design**. The caller
//!   keeps its holds and parks. Resolution from any other thread needs the
//!   lock the waiter still owns: permanent deadlock. Kept as the
//!   documented anti-pattern; the tests assert that it deadlocks, they do
//!   not fix it.
//! - [`DispatchPolicy::ReleaseAndWait`] — the reference strategy. Record
//!   the hold depth, release everything, park on the slot, reacquire the
//!   exact depth. Correct and responsive.
//! - [`DispatchPolicy::WorkerCondition`] — the initiating callback runs on
//!   a worker thread that holds the lock for the whole flow; it parks on a
//!   condition bound to the lock (which does the release/restore
//!   internally) until the resolving callback signals it.
//! - [`DispatchPolicy::Unlocked`] — the callback holds no session lock at
//!   all. It may park on the slot freely, but every UI mutation before and
//!   after the wait must go through a discrete lock acquisition, and the
//!   session state may have changed across the wait.

use std::sync::Arc;

use crate::dialog::{self, DialogRequest};
use crate::error::WaitError;
use crate::interaction::Presenter;
use crate::session::Session;

/// Which hand-off protocol a call site uses to wait for a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Park while still holding the lock. Deadlocks whenever resolution
    /// needs the lock from another thread. Anti-pattern, kept for
    /// demonstration and regression tests.
    HoldAndWait,
    /// Fully release before the wait, restore after. The default.
    ReleaseAndWait,
    /// Park on a condition signal bound to the lock; the resolver signals.
    WorkerCondition,
    /// Run without the lock and wait freely; lock in discrete steps.
    Unlocked,
}

impl DispatchPolicy {
    /// Opens a dialog and waits for its answer using this strategy.
    ///
    /// # Preconditions
    ///
    /// `HoldAndWait`, `ReleaseAndWait`, and `WorkerCondition` require the
    /// calling thread to hold the session lock; `Unlocked` requires it to
    /// hold zero holds. Violations panic.
    ///
    /// # Panics
    ///
    /// See preconditions.
    pub fn request<S, T: Clone + Send + Sync + 'static>(
        self,
        session: &Arc<Session<S>>,
        presenter: &Arc<dyn Presenter<T>>,
        request: DialogRequest<T>,
    ) -> Result<T, WaitError> {
        match self {
            Self::HoldAndWait => Self::hold_and_wait(session, presenter, request),
            Self::ReleaseAndWait => dialog::open_blocking(session, presenter, request),
            Self::WorkerCondition => Self::worker_condition(session, presenter, request),
            Self::Unlocked => Self::unlocked(session, presenter, request),
        }
    }

    /// Strategy 1: park on the slot without releasing anything.
    ///
    /// The wait can only ever finish if the resolver runs on this same
    /// thread before the park, which never happens in an event-driven UI.
    fn hold_and_wait<S, T: Clone + Send + 'static>(
        session: &Arc<Session<S>>,
        presenter: &Arc<dyn Presenter<T>>,
        request: DialogRequest<T>,
    ) -> Result<T, WaitError> {
        let lock = session.lock();
        assert!(
            lock.is_held_by_current_thread(),
            "HoldAndWait requires the session lock to be held"
        );
        let interaction = dialog::open_async(session.as_ref(), presenter, request);
        tracing::warn!("parking on a dialog while holding the session lock; this deadlocks if resolution needs the lock");
        interaction.slot().join()
    }

    /// Strategy 3: suspend on a condition bound to the lock; the resolving
    /// callback completes the slot, signals, and closes.
    fn worker_condition<S, T: Clone + Send + 'static>(
        session: &Arc<Session<S>>,
        presenter: &Arc<dyn Presenter<T>>,
        request: DialogRequest<T>,
    ) -> Result<T, WaitError> {
        let lock = session.lock();
        assert!(
            lock.is_held_by_current_thread(),
            "WorkerCondition requires the session lock to be held"
        );

        let condition = Arc::new(lock.new_condition());
        let request = {
            let condition = Arc::clone(&condition);
            request.on_resolved(move || condition.signal())
        };
        let interaction = dialog::open_async(session.as_ref(), presenter, request);
        let slot = Arc::clone(interaction.slot());

        // The resolver cannot run before we park: it needs the lock, and
        // await_uninterruptibly is what releases it.
        condition.await_uninterruptibly();
        // Signalled, so the slot is already terminal; this join is a read,
        // not a wait.
        slot.join()
    }

    /// Strategy 4: no lock held around the wait. Opening still mutates UI
    /// state, so it runs inside its own discrete lock acquisition.
    fn unlocked<S, T: Clone + Send + 'static>(
        session: &Arc<Session<S>>,
        presenter: &Arc<dyn Presenter<T>>,
        request: DialogRequest<T>,
    ) -> Result<T, WaitError> {
        let lock = session.lock();
        assert_eq!(
            lock.hold_count(),
            0,
            "Unlocked requires the caller to hold zero session locks"
        );

        lock.lock();
        let interaction = dialog::open_async(session.as_ref(), presenter, request);
        let slot = Arc::clone(interaction.slot());
        lock.unlock();

        slot.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Interaction, InteractionId, InteractionSpec};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct CountingPresenter {
        next_id: AtomicU64,
    }

    impl CountingPresenter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicU64::new(0),
            })
        }
    }

    impl<T> Presenter<T> for CountingPresenter {
        fn open(&self, _spec: &InteractionSpec) -> InteractionId {
            InteractionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        fn close(&self, _handle: InteractionId) {}
    }

    /// Drives a request on a worker thread and hands the opened
    /// interaction back so the test can play the resolving callback.
    fn drive<T: Clone + Send + Sync + 'static>(
        policy: DispatchPolicy,
        session: &Arc<Session<()>>,
        value_probe: mpsc::Sender<(Result<T, WaitError>, usize)>,
        interaction_probe: mpsc::Sender<Arc<Interaction<T>>>,
    ) -> thread::JoinHandle<()> {
        let session = Arc::clone(session);
        thread::spawn(move || {
            let presenter = CountingPresenter::new() as Arc<dyn Presenter<T>>;
            let locked = policy != DispatchPolicy::Unlocked;
            if locked {
                session.lock().lock();
            }
            let request = DialogRequest::new(InteractionSpec::ask("Name", "?"));
            // Open through the policy, but expose the interaction: reuse
            // open_async and block explicitly for observability.
            let result = match policy {
                DispatchPolicy::ReleaseAndWait => {
                    let interaction = dialog::open_async(session.as_ref(), &presenter, request);
                    interaction_probe
                        .send(Arc::clone(&interaction))
                        .expect("publish interaction");
                    dialog::block_on(&session, interaction.slot())
                }
                DispatchPolicy::WorkerCondition => {
                    let condition = Arc::new(session.lock().new_condition());
                    let request = {
                        let condition = Arc::clone(&condition);
                        request.on_resolved(move || condition.signal())
                    };
                    let interaction = dialog::open_async(session.as_ref(), &presenter, request);
                    interaction_probe
                        .send(Arc::clone(&interaction))
                        .expect("publish interaction");
                    condition.await_uninterruptibly();
                    interaction.slot().join()
                }
                DispatchPolicy::HoldAndWait => {
                    let interaction = dialog::open_async(session.as_ref(), &presenter, request);
                    interaction_probe
                        .send(Arc::clone(&interaction))
                        .expect("publish interaction");
                    interaction.slot().join()
                }
                DispatchPolicy::Unlocked => {
                    session.lock().lock();
                    let interaction = dialog::open_async(session.as_ref(), &presenter, request);
                    session.lock().unlock();
                    interaction_probe
                        .send(Arc::clone(&interaction))
                        .expect("publish interaction");
                    interaction.slot().join()
                }
            };
            let depth = session.lock().hold_count();
            if locked {
                session.lock().unlock();
            }
            let _ = value_probe.send((result, depth));
        })
    }

    #[test]
    fn release_and_wait_resolves_from_another_thread() {
        let session = Arc::new(Session::new(()));
        let (result_tx, result_rx) = mpsc::channel();
        let (interaction_tx, interaction_rx) = mpsc::channel();

        let caller = drive::<String>(
            DispatchPolicy::ReleaseAndWait,
            &session,
            result_tx,
            interaction_tx,
        );

        let interaction = interaction_rx.recv().expect("never opened");
        session.lock().lock();
        interaction.confirm("Ada".to_string());
        session.lock().unlock();

        let (result, depth) = result_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("ReleaseAndWait deadlocked");
        assert_eq!(result, Ok("Ada".to_string()));
        assert_eq!(depth, 1);
        caller.join().expect("caller panicked");
    }

    #[test]
    fn worker_condition_resolves_via_signal() {
        let session = Arc::new(Session::new(()));
        let (result_tx, result_rx) = mpsc::channel();
        let (interaction_tx, interaction_rx) = mpsc::channel();

        let caller = drive::<String>(
            DispatchPolicy::WorkerCondition,
            &session,
            result_tx,
            interaction_tx,
        );

        let interaction = interaction_rx.recv().expect("never opened");
        // The resolving callback acquires the lock once the waiter parks,
        // completes the slot, and the on_resolved hook signals.
        session.lock().lock();
        interaction.confirm("Grace".to_string());
        session.lock().unlock();

        let (result, depth) = result_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("WorkerCondition never woke");
        assert_eq!(result, Ok("Grace".to_string()));
        assert_eq!(depth, 1, "condition wait must restore the hold depth");
        caller.join().expect("caller panicked");
    }

    #[test]
    fn worker_condition_waiter_wakes_on_session_close() {
        let session = Arc::new(Session::new(()));
        let (result_tx, result_rx) = mpsc::channel();
        let (interaction_tx, interaction_rx) = mpsc::channel();

        let caller = drive::<String>(
            DispatchPolicy::WorkerCondition,
            &session,
            result_tx,
            interaction_tx,
        );
        let _interaction = interaction_rx.recv().expect("never opened");

        // No resolving callback ever runs. Teardown must take its place:
        // closing the session fires the interaction's hook, which signals
        // the condition the caller is parked on.
        session.close();

        let (result, depth) = result_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("condition waiter leaked on session close");
        assert_eq!(result, Err(WaitError::SessionClosed));
        assert_eq!(depth, 1, "condition wait must restore the hold depth");
        caller.join().expect("caller panicked");
    }

    #[test]
    fn unlocked_waits_freely_without_any_holds() {
        let session = Arc::new(Session::new(()));
        let (result_tx, result_rx) = mpsc::channel();
        let (interaction_tx, interaction_rx) = mpsc::channel();

        let caller = drive::<String>(
            DispatchPolicy::Unlocked,
            &session,
            result_tx,
            interaction_tx,
        );

        let interaction = interaction_rx.recv().expect("never opened");
        session.lock().lock();
        interaction.confirm("Edsger".to_string());
        session.lock().unlock();

        let (result, depth) = result_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("Unlocked wait never finished");
        assert_eq!(result, Ok("Edsger".to_string()));
        assert_eq!(depth, 0);
        caller.join().expect("caller panicked");
    }

    #[test]
    fn hold_and_wait_deadlocks_when_resolution_needs_the_lock() {
        let session = Arc::new(Session::new(()));
        let (result_tx, result_rx) = mpsc::channel();
        let (interaction_tx, interaction_rx) = mpsc::channel();

        // Deliberately leaked: both threads are permanently stuck, which is
        // exactly what this test demonstrates.
        let _caller = drive::<String>(
            DispatchPolicy::HoldAndWait,
            &session,
            result_tx,
            interaction_tx,
        );

        let interaction = interaction_rx.recv().expect("never opened");
        let (resolved_tx, resolved_rx) = mpsc::channel();
        let _resolver = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                // Needs the lock the waiter still holds: blocks forever.
                session.lock().lock();
                interaction.confirm("never".to_string());
                session.lock().unlock();
                resolved_tx.send(()).expect("report resolved");
            })
        };

        assert!(
            result_rx.recv_timeout(Duration::from_millis(400)).is_err(),
            "HoldAndWait unexpectedly completed; the anti-pattern was silently fixed"
        );
        assert!(
            resolved_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "resolver acquired a lock the waiter should still hold"
        );
        assert!(session.lock().is_locked(), "waiter should still own the lock");
        // The session itself stays locked forever; forget it rather than
        // tripping the drop-time assertion for a state this test created
        // on purpose.
        std::mem::forget(session);
    }

    #[test]
    #[should_panic(expected = "zero session locks")]
    fn unlocked_with_a_held_lock_panics() {
        let session = Arc::new(Session::new(()));
        let presenter = CountingPresenter::new() as Arc<dyn Presenter<String>>;
        session.lock().lock();
        let _ = DispatchPolicy::Unlocked.request(
            &session,
            &presenter,
            DialogRequest::new(InteractionSpec::ask("Name", "?")),
        );
    }

    #[test]
    #[should_panic(expected = "requires the session lock")]
    fn release_and_wait_with_zero_holds_panics() {
        let session = Arc::new(Session::new(()));
        let presenter = CountingPresenter::new() as Arc<dyn Presenter<String>>;
        let _ = DispatchPolicy::ReleaseAndWait.request(
            &session,
            &presenter,
            DialogRequest::new(InteractionSpec::ask("Name", "?")),
        );
    }
}
