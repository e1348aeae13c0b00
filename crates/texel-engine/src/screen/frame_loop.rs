use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::image::Selection;
use crate::input::SurfaceEvent;
use crate::time::{FrameClock, FrameTime};

use super::Screen;

/// Control directive returned by the per-frame callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Frame loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Per-frame context passed to the callback.
pub struct FrameCtx<'a, S> {
    /// Full-extent selection over the screen's current image.
    pub selection: Selection<'a, S>,
    pub time: FrameTime,
    /// Events received since the previous frame, oldest first.
    pub events: &'a [SurfaceEvent],
}

/// Requests a frame loop to stop from any thread.
///
/// The request is consulted between iterations; the frame in flight is still
/// drawn.
#[derive(Debug, Clone)]
pub struct LoopStopper(Arc<AtomicBool>);

impl LoopStopper {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives a [`Screen`]: callback, draw, swap, until asked to stop.
#[derive(Debug)]
pub struct FrameLoop<S: Screen> {
    screen: S,
    clock: FrameClock,
    state: LoopState,
    stop: LoopStopper,
}

impl<S: Screen> FrameLoop<S> {
    pub fn new(screen: S) -> Self {
        Self {
            screen,
            clock: FrameClock::new(),
            state: LoopState::Running,
            stop: LoopStopper(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn into_screen(self) -> S {
        self.screen
    }

    pub fn stopper(&self) -> LoopStopper {
        self.stop.clone()
    }

    /// Runs iterations until the callback returns [`AppControl::Exit`] or
    /// the loop's [`LoopStopper`] fires. Returns the number of frames run.
    ///
    /// Each iteration drains events (applying resizes), calls `on_frame`
    /// with a selection over the current image, draws, then swaps. An error
    /// from the screen stops the loop and is returned. A stopped loop cannot
    /// be run again.
    pub fn run<F>(&mut self, mut on_frame: F) -> Result<u64>
    where
        F: FnMut(&mut FrameCtx<'_, S::Store>) -> AppControl,
    {
        if self.state == LoopState::Stopped {
            return Err(Error::invalid_argument("frame loop already stopped"));
        }

        self.clock.reset();
        let mut frames = 0u64;
        let result = loop {
            match self.iterate(&mut on_frame) {
                Ok(control) => {
                    frames += 1;
                    if control == AppControl::Exit || self.stop.is_stop_requested() {
                        break Ok(frames);
                    }
                }
                Err(e) => {
                    log::error!("frame loop aborted after {frames} frames: {e}");
                    break Err(e);
                }
            }
        };

        self.state = LoopState::Stopped;
        log::debug!("frame loop stopped");
        result
    }

    fn iterate<F>(&mut self, on_frame: &mut F) -> Result<AppControl>
    where
        F: FnMut(&mut FrameCtx<'_, S::Store>) -> AppControl,
    {
        let events = self.screen.drain_events();
        for event in &events {
            if let SurfaceEvent::Resized { width, height } = *event {
                self.screen.resize(width, height)?;
            }
        }

        let time = self.clock.tick();
        let control = {
            let image = self.screen.current_image();
            let mut ctx = FrameCtx {
                selection: image.selection(),
                time,
                events: &events,
            };
            on_frame(&mut ctx)
        };

        self.screen.draw()?;
        self.screen.swap_images();
        Ok(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Clear;
    use crate::paint::Color;
    use crate::screen::{CpuScreen, ScreenConfig};

    fn screen(double_buffered: bool) -> CpuScreen {
        CpuScreen::new(ScreenConfig {
            width: 2,
            height: 2,
            double_buffered,
        })
        .unwrap()
    }

    #[test]
    fn exit_is_honored_after_the_frame_is_drawn() {
        let mut frame_loop = FrameLoop::new(screen(true));
        let frames = frame_loop
            .run(|ctx| {
                ctx.selection.modify(Clear(Color::WHITE), &[]).unwrap();
                AppControl::Exit
            })
            .unwrap();

        assert_eq!(frames, 1);
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(frame_loop.screen().presented(), &[Color::WHITE; 4]);
        assert_eq!(frame_loop.screen().frames_presented(), 1);
    }

    #[test]
    fn frames_alternate_images_when_double_buffered() {
        let mut frame_loop = FrameLoop::new(screen(true));
        let mut seen = Vec::new();
        frame_loop
            .run(|ctx| {
                // Paint only the first frame; the second works on the other image.
                if ctx.time.frame_index == 0 {
                    ctx.selection.set_color(0, 0, Color::WHITE);
                }
                seen.push(ctx.selection.color(0, 0));
                if ctx.time.frame_index == 1 {
                    AppControl::Exit
                } else {
                    AppControl::Continue
                }
            })
            .unwrap();
        assert_eq!(seen, vec![Color::WHITE, Color::TRANSPARENT]);
    }

    #[test]
    fn selection_covers_the_whole_image() {
        let mut frame_loop = FrameLoop::new(screen(false));
        frame_loop
            .run(|ctx| {
                assert_eq!(ctx.selection.bounds(), ctx.selection.image().bounds());
                AppControl::Exit
            })
            .unwrap();
    }

    #[test]
    fn stopper_ends_loop_between_iterations() {
        let mut frame_loop = FrameLoop::new(screen(false));
        let stopper = frame_loop.stopper();
        let frames = frame_loop
            .run(|ctx| {
                if ctx.time.frame_index == 2 {
                    stopper.stop();
                }
                AppControl::Continue
            })
            .unwrap();
        assert_eq!(frames, 3);
    }

    #[test]
    fn stopped_loop_cannot_restart() {
        let mut frame_loop = FrameLoop::new(screen(false));
        frame_loop.run(|_| AppControl::Exit).unwrap();
        let err = frame_loop.run(|_| AppControl::Exit).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn events_reach_the_callback_and_resize_applies() {
        let mut frame_loop = FrameLoop::new(screen(true));
        let sink = frame_loop.screen().events();
        sink.push(SurfaceEvent::Resized { width: 5, height: 3 });
        sink.push(SurfaceEvent::CloseRequested);

        frame_loop
            .run(|ctx| {
                assert_eq!(ctx.events.len(), 2);
                assert_eq!((ctx.selection.width(), ctx.selection.height()), (5, 3));
                if ctx.events.contains(&SurfaceEvent::CloseRequested) {
                    AppControl::Exit
                } else {
                    AppControl::Continue
                }
            })
            .unwrap();
    }

    #[test]
    fn loops_run_concurrently_on_separate_threads() {
        let totals: Vec<u64> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..3)
                .map(|n| {
                    scope.spawn(move || {
                        let mut frame_loop = FrameLoop::new(screen(true));
                        frame_loop
                            .run(|ctx| {
                                if ctx.time.frame_index as usize == n {
                                    AppControl::Exit
                                } else {
                                    AppControl::Continue
                                }
                            })
                            .unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(totals, vec![1, 2, 3]);
    }
}
