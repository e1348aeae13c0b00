use crate::executor::ExecutorError;

/// Convenience result type used across the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for engine APIs.
///
/// Out-of-bounds pixel access and buffer-length mismatches have no variant:
/// both have defined, non-failing behavior.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Owning-thread misuse: double start, submission after stop, or a
    /// submission from the owning thread itself.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A program was rejected by the backend.
    #[error("failed to compile program `{label}`: {reason}")]
    Compile { label: String, reason: String },

    /// Device, surface or readback failure.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// A constructor was handed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn compile(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns `true` for owning-thread misuse.
    pub fn is_executor_misuse(&self) -> bool {
        matches!(self, Self::Executor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_carries_reason() {
        let err = Error::compile("fill", "expected `;`");
        assert_eq!(err.to_string(), "failed to compile program `fill`: expected `;`");
    }

    #[test]
    fn executor_errors_convert() {
        let err: Error = ExecutorError::Stopped.into();
        assert!(err.is_executor_misuse());
    }
}
