//! Button and LED traits for abstraction and testability

use crate::error::GpioError;
use crate::zone::LedColor;

/// The zero-point button
pub trait Button {
    /// Whether the button is held down right now
    fn is_pressed(&mut self) -> Result<bool, GpioError>;
}

/// The three-channel status LED
pub trait Led {
    fn set_color(&mut self, color: LedColor) -> Result<(), GpioError>;
}

/// Change in button state between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Edge detector over button samples
#[derive(Debug, Default)]
pub struct ButtonTracker {
    was_pressed: bool,
}

impl ButtonTracker {
    pub fn new() -> Self {
        Self { was_pressed: false }
    }

    pub fn update(&mut self, pressed: bool) -> Option<ButtonEdge> {
        let edge = match (self.was_pressed, pressed) {
            (false, true) => Some(ButtonEdge::Pressed),
            (true, false) => Some(ButtonEdge::Released),
            _ => None,
        };
        self.was_pressed = pressed;
        edge
    }
}
