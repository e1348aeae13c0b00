use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::mpsc;
use std::thread::{self, ThreadId};

use super::ExecutorError;
use super::main_thread::{ExecutorState, load_state};

pub(super) type Job = Box<dyn FnOnce() + Send + 'static>;

pub(super) enum Message {
    Run(Job),
    Stop,
}

type Outcome<R> = std::result::Result<R, Box<dyn Any + Send + 'static>>;

/// Submission side of a running [`Executor`](super::Executor).
///
/// Cheap to clone and safe to share across threads. Every call blocks the
/// caller until the owning thread has run the work; calls made from one
/// thread execute in the order they were made.
#[derive(Clone)]
pub struct ExecutorHandle {
    tx: mpsc::Sender<Message>,
    owner: ThreadId,
    state: Arc<AtomicU8>,
}

impl ExecutorHandle {
    pub(super) fn new(tx: mpsc::Sender<Message>, owner: ThreadId, state: Arc<AtomicU8>) -> Self {
        Self { tx, owner, state }
    }

    /// Runs `f` on the owning thread and returns its value.
    ///
    /// A panic inside `f` is resumed on the calling thread; the owning thread
    /// keeps serving.
    pub fn call<F, R>(&self, f: F) -> Result<R, ExecutorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.state() == ExecutorState::Stopped {
            return Err(ExecutorError::Stopped);
        }
        if self.is_owner_thread() {
            log::warn!("rejected re-entrant submission on the owning thread");
            return Err(ExecutorError::Reentrant);
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel::<Outcome<R>>(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // The submitter only goes away by unwinding; nothing to report to.
            let _ = reply_tx.send(outcome);
        });

        self.tx
            .send(Message::Run(job))
            .map_err(|_| ExecutorError::Stopped)?;

        match reply_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            // Job dropped unexecuted: the owner stopped with it still queued.
            Err(_) => Err(ExecutorError::Stopped),
        }
    }

    /// Runs `f` on the owning thread, discarding any value.
    pub fn exec<F>(&self, f: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.call(f)
    }

    /// Runs a fallible `f` on the owning thread, flattening marshaling errors
    /// into the caller's error type.
    pub fn try_call<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<ExecutorError> + Send + 'static,
    {
        self.call(f)?
    }

    /// Asks the owning thread to stop after the work already queued.
    ///
    /// Stopping is one-way; later submissions fail with
    /// [`ExecutorError::Stopped`].
    pub fn request_stop(&self) {
        // Already stopped when the receiver is gone.
        let _ = self.tx.send(Message::Stop);
    }

    /// Whether the current thread is the owning thread.
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn state(&self) -> ExecutorState {
        load_state(&self.state)
    }
}

impl std::fmt::Debug for ExecutorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorHandle")
            .field("owner", &self.owner)
            .field("state", &self.state())
            .finish()
    }
}
