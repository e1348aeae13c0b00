/// Owning-thread usage errors.
///
/// These indicate a programming error at the call site; they are reported
/// immediately instead of degrading into a deadlock.
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExecutorError {
    /// The executor has already claimed an owning thread.
    #[error("executor already started; the owning thread can only be claimed once")]
    AlreadyStarted,

    /// The executor stopped before the work could run.
    #[error("executor has stopped; no further work is accepted")]
    Stopped,

    /// The owning thread submitted work to itself.
    #[error("re-entrant submission from the owning thread")]
    Reentrant,
}
