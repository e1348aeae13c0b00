use crate::accel::CpuStore;
use crate::error::Result;
use crate::image::Image;
use crate::input::{SharedEventBuffer, SurfaceEvent};
use crate::paint::Color;

use super::{EVENT_CAPACITY, Screen, ScreenConfig};

/// Headless screen backed by CPU images.
///
/// `draw` copies the current image into the presented frame, which tests and
/// offscreen renderers read back through [`presented`](Self::presented).
#[derive(Debug)]
pub struct CpuScreen {
    images: Vec<Image<CpuStore>>,
    current: usize,
    presented: Vec<Color>,
    frames_presented: u64,
    events: SharedEventBuffer<SurfaceEvent>,
}

impl CpuScreen {
    pub fn new(config: ScreenConfig) -> Result<Self> {
        let images = make_images(&config)?;
        Ok(Self {
            images,
            current: 0,
            presented: Vec::new(),
            frames_presented: 0,
            events: SharedEventBuffer::new(EVENT_CAPACITY)?,
        })
    }

    /// Last presented frame, row-major; empty before the first draw.
    pub fn presented(&self) -> &[Color] {
        &self.presented
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Handle for feeding events to this screen.
    pub fn events(&self) -> SharedEventBuffer<SurfaceEvent> {
        self.events.clone()
    }

    pub fn is_double_buffered(&self) -> bool {
        self.images.len() == 2
    }
}

fn make_images(config: &ScreenConfig) -> Result<Vec<Image<CpuStore>>> {
    let count = if config.double_buffered { 2 } else { 1 };
    (0..count)
        .map(|_| Image::new_cpu(config.width, config.height))
        .collect()
}

impl Screen for CpuScreen {
    type Store = CpuStore;

    fn current_image(&self) -> &Image<CpuStore> {
        &self.images[self.current]
    }

    fn draw(&mut self) -> Result<()> {
        self.presented = self.current_image().store().to_vec();
        self.frames_presented += 1;
        Ok(())
    }

    fn swap_images(&mut self) {
        self.current = (self.current + 1) % self.images.len();
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let config = ScreenConfig {
            width,
            height,
            double_buffered: self.is_double_buffered(),
        };
        let images = make_images(&config)?;
        for old in std::mem::replace(&mut self.images, images) {
            old.release()?;
        }
        self.current = 0;
        log::debug!("cpu screen resized to {width}x{height}");
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain()
    }
}
