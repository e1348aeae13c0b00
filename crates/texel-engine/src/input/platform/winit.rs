use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};

use crate::input::{MouseButton, SurfaceEvent};

impl SurfaceEvent {
    /// Translates a winit `WindowEvent`.
    ///
    /// Returns `None` for events a frame loop has no use for.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::Resized(size) => Some(Self::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(Self::CloseRequested),
            WindowEvent::Focused(f) => Some(Self::Focused(*f)),
            WindowEvent::RedrawRequested => Some(Self::RedrawRequested),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                Some(Self::ScaleFactorChanged(*scale_factor))
            }
            WindowEvent::CursorMoved { position, .. } => Some(Self::PointerMoved {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::CursorLeft { .. } => Some(Self::PointerLeft),
            WindowEvent::MouseInput { state, button, .. } => Some(Self::PointerButton {
                button: map_mouse_button(*button),
                pressed: *state == ElementState::Pressed,
            }),
            _ => None,
        }
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn window_events_translate() {
        assert_eq!(
            SurfaceEvent::from_window_event(&WindowEvent::Resized(PhysicalSize::new(800, 600))),
            Some(SurfaceEvent::Resized { width: 800, height: 600 })
        );
        assert_eq!(
            SurfaceEvent::from_window_event(&WindowEvent::CloseRequested),
            Some(SurfaceEvent::CloseRequested)
        );
        assert_eq!(
            SurfaceEvent::from_window_event(&WindowEvent::Focused(false)),
            Some(SurfaceEvent::Focused(false))
        );
        assert_eq!(SurfaceEvent::from_window_event(&WindowEvent::Occluded(true)), None);
    }

    #[test]
    fn mouse_buttons_map() {
        assert_eq!(map_mouse_button(WinitMouseButton::Other(7)), MouseButton::Other(7));
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
    }
}
