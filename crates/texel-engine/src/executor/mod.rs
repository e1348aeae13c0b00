//! Owning-thread executor.
//!
//! Native graphics contexts may only be touched from the thread that created
//! them. [`Executor::run`] claims the calling thread as that owner, runs the
//! application callback on a separate thread, and serves marshaled calls until
//! the callback returns. Any thread holding an [`ExecutorHandle`] can submit
//! work; submission blocks until the owner has executed it.
//!
//! Lifecycle: `NotStarted -> Running -> Stopped`. Each [`Executor`] can be run
//! exactly once; [`Executor::global`] is the process-wide instance.

mod error;
mod handle;
mod main_thread;

pub use error::ExecutorError;
pub use handle::ExecutorHandle;
pub use main_thread::{Executor, ExecutorState};
