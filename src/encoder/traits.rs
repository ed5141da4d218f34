//! Rotary encoder trait for abstraction and testability
//!
//! The event loop only sees an [`Encoder`]: a non-blocking event queue, the
//! current state and a reset. The interrupt-driven driver on the board and
//! the mock used in tests both implement it.

use crate::error::EncoderError;

/// Rotation direction of the last counted step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// No step counted since start or the last reset
    #[default]
    NotSet,
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::NotSet => "NOT_SET",
            Direction::Clockwise => "CW",
            Direction::CounterClockwise => "CCW",
        }
    }
}

/// Position and direction of the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderState {
    pub position: i32,
    pub direction: Direction,
}

/// Emitted for every counted step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderEvent {
    pub state: EncoderState,
}

/// Decoder options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Count at both rest states instead of once per detent
    pub half_steps: bool,
    /// Swap clockwise and counter-clockwise
    pub flip_direction: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        use crate::config::encoder;

        Self {
            half_steps: encoder::ENABLE_HALF_STEPS,
            flip_direction: encoder::FLIP_DIRECTION,
        }
    }
}

/// Abstract rotary encoder interface for testability
pub trait Encoder {
    /// Apply decoder options
    fn configure(&mut self, options: &EncoderOptions) -> Result<(), EncoderError>;

    /// Take one pending event, if any. Never blocks.
    fn poll_nonblocking(&mut self) -> Option<EncoderEvent>;

    /// Read the current state
    fn current_state(&self) -> Result<EncoderState, EncoderError>;

    /// Set the position back to zero
    fn reset(&mut self) -> Result<(), EncoderError>;
}
