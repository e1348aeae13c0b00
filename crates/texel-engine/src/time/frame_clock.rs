use std::time::{Duration, Instant};

/// Timing of one frame-loop iteration.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time since the previous tick, in seconds, clamped.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Iteration counter, starting at zero.
    pub frame_index: u64,
}

/// Produces [`FrameTime`] snapshots, one per frame-loop iteration.
///
/// Each loop owns its own clock so concurrent loops never share delta-time
/// state. Delta time is clamped so a stall (debugger, minimized window, slow
/// present) does not surface as a huge step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clock clamping delta time to `[100us, 250ms]`.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Clock with custom delta-time clamps. `dt_min` is lowered to `dt_max`
    /// if it exceeds it.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min: dt_min.min(dt_max),
            dt_max,
        }
    }

    /// Resets the delta-time baseline (not the frame index).
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
