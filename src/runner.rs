//! UI task runner: scheduling work under the session lock.
//!
//! The core consumes this contract rather than owning it: some collaborator
//! must be able to run a callback while holding the session lock, either
//! immediately on the calling thread ([`UiTaskRunner::run_synchronously`])
//! or later on a worker ([`UiTaskRunner::run_asynchronously`]). The only
//! properties the rest of the crate relies on are:
//!
//! - every scheduled task eventually runs while holding the lock, exactly
//!   once, or fails its completion ticket once the session is closed
//! - asynchronous delivery is FIFO per submitting thread
//!
//! [`ThreadedRunner`] is the reference implementation: one worker thread
//! draining a queue, acquiring the session lock around each task. It is
//! what the demos and tests use; a real UI shell would provide its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::error::DispatchError;
use crate::session::Session;
use crate::slot::ResultSlot;
use crate::sync::reentrant::HeldLock;
use crate::sync::SessionLock;

/// A unit of work to run while holding the session lock.
pub type Task = Box<dyn FnOnce() + Send>;

/// Completion signal for an asynchronously scheduled task.
///
/// Resolves `Ok(())` once the task has run, or with
/// [`WaitError::SessionClosed`] if the task was dropped because the
/// session closed after submission. Submitters that do not care may drop
/// the ticket.
///
/// [`WaitError::SessionClosed`]: crate::error::WaitError::SessionClosed
pub type CompletionTicket = Arc<ResultSlot<()>>;

/// Contract for scheduling work under a session's lock.
pub trait UiTaskRunner: Send + Sync {
    /// Runs `task` before returning, with the session lock held.
    ///
    /// If the calling thread already owns the lock the task runs inside
    /// the existing critical section; otherwise the call blocks until the
    /// lock can be acquired.
    fn run_synchronously(&self, task: Task);

    /// Schedules `task` to run later under the lock, without blocking the
    /// caller. Delivery is FIFO per submitting thread.
    ///
    /// The returned ticket resolves when the task has run, or fails if the
    /// session closes before the task gets its turn.
    fn run_asynchronously(&self, task: Task) -> Result<CompletionTicket, DispatchError>;
}

enum Job {
    Run(Task, CompletionTicket),
    Shutdown,
}

/// Single-worker [`UiTaskRunner`] for a session.
///
/// Tasks submitted through [`UiTaskRunner::run_asynchronously`] are drained
/// in submission order by one worker thread, which acquires the session
/// lock around each task. A submission against an already-closed session
/// is rejected outright; a task overtaken by the close while queued fails
/// its completion ticket instead of running. Dropping the runner shuts the
/// worker down after the already-queued tasks have drained.
pub struct ThreadedRunner {
    lock: Arc<SessionLock>,
    refuse: AtomicBool,
    session_closed: Box<dyn Fn() -> bool + Send + Sync>,
    queue: mpsc::Sender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedRunner {
    /// Spawns the worker thread for the given session.
    #[must_use]
    pub fn new<S: Send + Sync + 'static>(session: &Arc<Session<S>>) -> Self {
        let lock = Arc::clone(session.lock());
        let (queue, jobs) = mpsc::channel::<Job>();

        let worker = {
            let session = Arc::clone(session);
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                for job in jobs {
                    match job {
                        Job::Run(task, ticket) => {
                            if session.is_closed() {
                                tracing::warn!("dropping task scheduled on a closed session");
                                ticket.fail_closed();
                                continue;
                            }
                            let _held = HeldLock::acquire(&lock);
                            task();
                            ticket.complete(());
                        }
                        Job::Shutdown => break,
                    }
                }
            })
        };

        let session_closed = {
            let session = Arc::clone(session);
            Box::new(move || session.is_closed()) as Box<dyn Fn() -> bool + Send + Sync>
        };
        Self {
            lock,
            refuse: AtomicBool::new(false),
            session_closed,
            queue,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Marks the runner as no longer accepting work, without waiting for
    /// queued tasks. Subsequent submissions fail with
    /// [`DispatchError::SessionClosed`].
    pub fn refuse_new_tasks(&self) {
        self.refuse.store(true, Ordering::Release);
    }
}

impl UiTaskRunner for ThreadedRunner {
    fn run_synchronously(&self, task: Task) {
        let _held = HeldLock::acquire(&self.lock);
        task();
    }

    fn run_asynchronously(&self, task: Task) -> Result<CompletionTicket, DispatchError> {
        if self.refuse.load(Ordering::Acquire) || (self.session_closed)() {
            tracing::warn!("rejecting task scheduled on a closed session");
            return Err(DispatchError::SessionClosed);
        }
        let ticket: CompletionTicket = Arc::new(ResultSlot::new());
        self.queue
            .send(Job::Run(task, Arc::clone(&ticket)))
            .map_err(|_| DispatchError::RunnerStopped)?;
        Ok(ticket)
    }
}

impl Drop for ThreadedRunner {
    fn drop(&mut self) {
        let _ = self.queue.send(Job::Shutdown);
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaitError;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn synchronous_task_runs_under_the_lock() {
        let session = Arc::new(Session::new(0i32));
        let runner = ThreadedRunner::new(&session);

        let observed = {
            let session = Arc::clone(&session);
            let (tx, rx) = mpsc::channel();
            runner.run_synchronously(Box::new(move || {
                tx.send(session.lock().hold_count()).expect("report");
            }));
            rx.recv().expect("task never ran")
        };
        assert_eq!(observed, 1);
        assert_eq!(session.lock().hold_count(), 0);
    }

    #[test]
    fn synchronous_task_reenters_an_already_held_lock() {
        let session = Arc::new(Session::new(()));
        let runner = ThreadedRunner::new(&session);

        session.lock().lock();
        let (tx, rx) = mpsc::channel();
        {
            let session = Arc::clone(&session);
            runner.run_synchronously(Box::new(move || {
                tx.send(session.lock().hold_count()).expect("report");
            }));
        }
        assert_eq!(rx.recv().expect("task never ran"), 2);
        assert_eq!(session.lock().hold_count(), 1);
        session.lock().unlock();
    }

    #[test]
    fn asynchronous_tasks_run_in_submission_order() {
        let session = Arc::new(Session::new(Vec::<i32>::new()));
        let runner = ThreadedRunner::new(&session);
        let (done_tx, done_rx) = mpsc::channel();

        for i in 0..10 {
            let session = Arc::clone(&session);
            let done_tx = done_tx.clone();
            runner
                .run_asynchronously(Box::new(move || {
                    session.with_state(|items| items.push(i));
                    if i == 9 {
                        done_tx.send(()).expect("report done");
                    }
                }))
                .expect("submit");
        }

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("tasks never drained");

        session.lock().lock();
        let items = session.with_state(|items| items.clone());
        session.lock().unlock();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn asynchronous_task_holds_the_lock_while_running() {
        let session = Arc::new(Session::new(()));
        let runner = ThreadedRunner::new(&session);
        let (tx, rx) = mpsc::channel();

        {
            let session = Arc::clone(&session);
            runner
                .run_asynchronously(Box::new(move || {
                    tx.send(session.lock().hold_count()).expect("report");
                }))
                .expect("submit");
        }
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).expect("task ran"),
            1
        );
    }

    #[test]
    fn refused_runner_rejects_submissions() {
        let session = Arc::new(Session::new(()));
        let runner = ThreadedRunner::new(&session);
        runner.refuse_new_tasks();

        let result = runner.run_asynchronously(Box::new(|| {}));
        assert!(matches!(result, Err(DispatchError::SessionClosed)));
    }

    #[test]
    fn submitting_to_a_closed_session_is_rejected() {
        let session = Arc::new(Session::new(0i32));
        let runner = ThreadedRunner::new(&session);

        session.close();
        let result = runner.run_asynchronously(Box::new(|| {}));
        assert!(matches!(result, Err(DispatchError::SessionClosed)));
    }

    #[test]
    fn task_overtaken_by_close_fails_its_ticket() {
        let session = Arc::new(Session::new(()));
        let runner = ThreadedRunner::new(&session);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (entered_tx, entered_rx) = mpsc::channel();

        // Occupy the worker so the next task stays queued.
        let blocker_ticket = runner
            .run_asynchronously(Box::new(move || {
                entered_tx.send(()).expect("report entered");
                gate_rx.recv().expect("wait for gate");
            }))
            .expect("submit blocker");
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("blocker never started");

        let ran = Arc::new(AtomicBool::new(false));
        let ticket = {
            let ran = Arc::clone(&ran);
            runner
                .run_asynchronously(Box::new(move || {
                    ran.store(true, Ordering::SeqCst);
                }))
                .expect("submit")
        };

        // Close on another thread: teardown waits for the session lock the
        // blocker holds, but the closed flag flips immediately.
        let closer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.close())
        };
        while !session.is_closed() {
            std::thread::sleep(Duration::from_millis(5));
        }
        gate_tx.send(()).expect("release blocker");

        assert_eq!(blocker_ticket.join(), Ok(()));
        assert_eq!(ticket.join(), Err(WaitError::SessionClosed));
        assert!(!ran.load(Ordering::SeqCst), "task ran on a closed session");
        closer.join().expect("closer panicked");
    }

    #[test]
    fn a_panicking_task_does_not_wedge_the_lock() {
        let session = Arc::new(Session::new(()));
        let runner = ThreadedRunner::new(&session);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runner.run_synchronously(Box::new(|| panic!("task blew up")));
        }));
        assert!(result.is_err());
        assert!(
            !session.lock().is_locked(),
            "lock still held after a panicking task"
        );
    }
}
