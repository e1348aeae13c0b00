/// Mouse buttons.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Window-level event delivered to a frame loop.
///
/// Positions and sizes are physical pixels, matching image coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SurfaceEvent {
    Resized { width: u32, height: u32 },
    CloseRequested,
    Focused(bool),
    RedrawRequested,
    ScaleFactorChanged(f64),
    PointerMoved { x: f64, y: f64 },
    PointerLeft,
    PointerButton { button: MouseButton, pressed: bool },
}
