//! Pointer and wheel events fed to the interaction controller
//!
//! Positions are canvas pixels with the origin at the top-left corner.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalPosition {
    pub x: f64,
    pub y: f64,
}

impl PhysicalPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseScrollDelta {
    /// Wheel notches; negative y scrolls up (zoom in).
    LineDelta(f32, f32),
    PixelDelta(PhysicalPosition),
}

impl MouseScrollDelta {
    /// Signed notch count on the vertical axis. Pixel deltas are folded into
    /// notches of 100 px, the usual browser wheel step.
    pub fn vertical_notches(&self) -> f64 {
        match self {
            MouseScrollDelta::LineDelta(_, y) => *y as f64,
            MouseScrollDelta::PixelDelta(p) => p.y / 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ElementState {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
    MouseWheel { delta: MouseScrollDelta },
    CursorMoved { position: PhysicalPosition },
    MouseInput {
        state: ElementState,
        button: MouseButton,
    },
}
