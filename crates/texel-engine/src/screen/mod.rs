//! Screens and the frame loop.
//!
//! A [`Screen`] owns one or two images of the surface's size. The
//! [`FrameLoop`] hands the application a full-extent selection of the
//! current image each iteration, then draws it and swaps buffers.

mod cpu;
mod frame_loop;
mod surface;

pub use cpu::CpuScreen;
pub use frame_loop::{AppControl, FrameCtx, FrameLoop, LoopState, LoopStopper};
pub use surface::SurfaceScreen;

use crate::accel::AcceleratedStore;
use crate::error::Result;
use crate::image::Image;
use crate::input::SurfaceEvent;

/// Default capacity of a screen's event buffer.
pub const EVENT_CAPACITY: usize = 256;

/// Screen configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenConfig {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Keep a visible and a working image and swap them after each draw.
    pub double_buffered: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            double_buffered: true,
        }
    }
}

/// Something a frame loop can draw to.
pub trait Screen {
    type Store: AcceleratedStore;

    /// The working image: the one the next frame is painted into.
    fn current_image(&self) -> &Image<Self::Store>;

    /// Presents the current image. May block on the display's refresh.
    fn draw(&mut self) -> Result<()>;

    /// Exchanges the visible and working images. No-op when single buffered.
    fn swap_images(&mut self);

    /// Replaces the images with transparent ones of the new size.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Events received since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        Vec::new()
    }
}
