//! GPU backend.
//!
//! This module is responsible for:
//! - creating the wgpu Adapter/Device/Queue on the executor's thread
//! - texture-backed image stores and their drawing handle
//! - compiling WGSL programs and the built-in fill/blit programs
//! - surface format and error policy used by window screens

mod commands;
pub(crate) mod context;
mod init;
pub(crate) mod pipeline;
mod program;
pub(crate) mod store;
pub(crate) mod surface;

pub use commands::Draw;
pub use context::GpuContext;
pub use init::GpuInit;
pub use pipeline::{DrawParams, IMAGE_FORMAT};
pub use program::{Program, ProgramDesc};
pub use store::{GpuSource, GpuStore, GpuTarget};
pub use surface::SurfaceErrorAction;
