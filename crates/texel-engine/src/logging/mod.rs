//! Logging setup.
//!
//! Everything in this crate logs through the `log` facade. Binaries and tests
//! call [`init_logging`] once to route those records to `env_logger`.

mod init;

pub use init::{LoggingConfig, init_logging};
