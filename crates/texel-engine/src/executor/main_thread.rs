use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::thread;

use state::InitCell;

use super::ExecutorError;
use super::handle::{ExecutorHandle, Message};

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of an [`Executor`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExecutorState {
    NotStarted,
    Running,
    /// Terminal.
    Stopped,
}

pub(super) fn load_state(state: &AtomicU8) -> ExecutorState {
    match state.load(Ordering::Acquire) {
        NOT_STARTED => ExecutorState::NotStarted,
        RUNNING => ExecutorState::Running,
        _ => ExecutorState::Stopped,
    }
}

static GLOBAL: InitCell<Executor> = InitCell::new();

/// Owner of the thread bound to the native graphics context.
///
/// The start guard lives on the object: [`run`](Self::run) succeeds once per
/// instance. Applications use [`Executor::global`] so that the guard is
/// process-wide.
#[derive(Debug)]
pub struct Executor {
    state: Arc<AtomicU8>,
}

impl Executor {
    /// Creates an executor that has not claimed a thread yet.
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(NOT_STARTED)),
        }
    }

    /// The process-wide executor.
    pub fn global() -> &'static Executor {
        GLOBAL.get_or_init(Executor::new)
    }

    pub fn state(&self) -> ExecutorState {
        load_state(&self.state)
    }

    /// Claims the current thread as the owning thread and serves marshaled
    /// calls until `app` returns.
    ///
    /// `app` runs on a separate thread with a handle for submitting work.
    /// Returns `app`'s value, or [`ExecutorError::AlreadyStarted`] if this
    /// executor was run before. A panic in `app` is resumed here after the
    /// executor has stopped.
    pub fn run<F, R>(&self, app: F) -> Result<R, ExecutorError>
    where
        F: FnOnce(ExecutorHandle) -> R + Send,
        R: Send,
    {
        if self
            .state
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::error!("executor start requested twice");
            return Err(ExecutorError::AlreadyStarted);
        }

        let owner = thread::current().id();
        let (tx, rx) = mpsc::channel::<Message>();
        let handle = ExecutorHandle::new(tx.clone(), owner, Arc::clone(&self.state));

        log::info!("executor started on {owner:?}");

        let joined = thread::scope(|scope| {
            let app_thread = scope.spawn(move || {
                let _stop = StopOnDrop(tx);
                app(handle)
            });

            serve(&rx);
            self.state.store(STOPPED, Ordering::Release);
            // Anything still queued is dropped here and reports `Stopped`.
            drop(rx);

            app_thread.join()
        });

        log::info!("executor stopped");

        match joined {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

fn serve(rx: &mpsc::Receiver<Message>) {
    let mut served: u64 = 0;
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(job) => {
                job();
                served += 1;
            }
            Message::Stop => break,
        }
    }
    log::debug!("owning thread served {served} calls");
}

/// Sends `Stop` when the application callback finishes, including by panic.
struct StopOnDrop(mpsc::Sender<Message>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        let _ = self.0.send(Message::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test_log::test]
    fn calls_from_one_thread_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let executor = Executor::new();

        let seen = Arc::clone(&log);
        executor
            .run(move |h| {
                let a = Arc::clone(&seen);
                h.exec(move || a.lock().unwrap().push("A")).unwrap();
                let b = Arc::clone(&seen);
                h.exec(move || b.lock().unwrap().push("B")).unwrap();
            })
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn work_runs_on_the_owning_thread() {
        let executor = Executor::new();
        let owner = thread::current().id();

        let ran_on = executor
            .run(|h| {
                assert_ne!(thread::current().id(), owner);
                h.call(|| thread::current().id()).unwrap()
            })
            .unwrap();

        assert_eq!(ran_on, owner);
    }

    #[test]
    fn call_returns_value_and_blocks_until_done() {
        let executor = Executor::new();
        let value = executor
            .run(|h| {
                h.call(|| {
                    thread::sleep(std::time::Duration::from_millis(20));
                    21 * 2
                })
                .unwrap()
            })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn second_start_fails() {
        let executor = Executor::new();
        executor.run(|_| ()).unwrap();
        assert_eq!(executor.run(|_| ()), Err(ExecutorError::AlreadyStarted));
        assert_eq!(executor.state(), ExecutorState::Stopped);
    }

    #[test]
    fn start_while_running_fails() {
        let executor = Executor::new();
        let nested = executor.run(|_| executor.run(|_| ())).unwrap();
        assert_eq!(nested, Err(ExecutorError::AlreadyStarted));
    }

    #[test]
    fn reentrant_submission_is_rejected() {
        let executor = Executor::new();
        let inner = executor
            .run(|h| {
                let again = h.clone();
                h.call(move || again.call(|| ())).unwrap()
            })
            .unwrap();
        assert_eq!(inner, Err(ExecutorError::Reentrant));
    }

    #[test]
    fn submission_after_stop_fails() {
        let executor = Executor::new();
        let handle = executor.run(|h| h).unwrap();

        assert_eq!(handle.state(), ExecutorState::Stopped);
        assert_eq!(handle.call(|| 1), Err(ExecutorError::Stopped));
    }

    #[test]
    fn request_stop_is_one_way() {
        let executor = Executor::new();
        let after = executor
            .run(|h| {
                h.exec(|| ()).unwrap();
                h.request_stop();
                // Let the owner observe the stop before submitting again.
                while h.state() != ExecutorState::Stopped {
                    thread::yield_now();
                }
                h.call(|| ())
            })
            .unwrap();
        assert_eq!(after, Err(ExecutorError::Stopped));
    }

    #[test]
    fn panic_in_work_reaches_the_submitter() {
        let executor = Executor::new();
        let (caught, after) = executor
            .run(|h| {
                let worker = h.clone();
                let caught = panic::catch_unwind(panic::AssertUnwindSafe(move || {
                    worker.call(|| -> u32 { panic!("boom") })
                }));
                (caught.is_err(), h.call(|| "still serving").unwrap())
            })
            .unwrap();

        assert!(caught);
        assert_eq!(after, "still serving");
    }

    #[test_log::test]
    fn per_thread_order_holds_under_contention() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let executor = Executor::new();

        let seen = Arc::clone(&log);
        executor
            .run(move |h| {
                thread::scope(|scope| {
                    for worker in 0..4u32 {
                        let h = h.clone();
                        let seen = Arc::clone(&seen);
                        scope.spawn(move || {
                            for i in 0..50u32 {
                                let seen = Arc::clone(&seen);
                                h.exec(move || seen.lock().unwrap().push((worker, i))).unwrap();
                            }
                        });
                    }
                });
            })
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 200);
        for worker in 0..4u32 {
            let order: Vec<u32> =
                log.iter().filter(|(w, _)| *w == worker).map(|(_, i)| *i).collect();
            assert_eq!(order, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn global_is_a_single_instance() {
        assert!(std::ptr::eq(Executor::global(), Executor::global()));
    }
}
