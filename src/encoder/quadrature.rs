//! Table-driven quadrature decoder
//!
//! Pin state is `(A << 1) | B`. Clockwise rotation runs
//! `00 -> 10 -> 11 -> 01 -> 00`, counter-clockwise the reverse. A count is
//! only emitted once a complete valid sequence reaches a rest state, so
//! contact bounce and skipped states never move the position.
//!
//! In full-step mode the only rest state is `00` (one count per detent).
//! Half-step mode also treats `11` as a rest state.

use super::traits::{Direction, EncoderOptions, EncoderState};

const DIR_CW: u8 = 0x10;
const DIR_CCW: u8 = 0x20;
const STATE_MASK: u8 = 0x0F;

// Full-step states
const F_START: u8 = 0;
const F_CW_BEGIN: u8 = 1;
const F_CW_NEXT: u8 = 2;
const F_CW_FINAL: u8 = 3;
const F_CCW_BEGIN: u8 = 4;
const F_CCW_NEXT: u8 = 5;
const F_CCW_FINAL: u8 = 6;

/// Next state for each pin state `[00, 01, 10, 11]`
const FULL_STEP: [[u8; 4]; 7] = [
    // F_START
    [F_START, F_CCW_BEGIN, F_CW_BEGIN, F_START],
    // F_CW_BEGIN
    [F_START, F_START, F_CW_BEGIN, F_CW_NEXT],
    // F_CW_NEXT
    [F_START, F_CW_FINAL, F_CW_BEGIN, F_CW_NEXT],
    // F_CW_FINAL
    [F_START | DIR_CW, F_CW_FINAL, F_START, F_CW_NEXT],
    // F_CCW_BEGIN
    [F_START, F_CCW_BEGIN, F_START, F_CCW_NEXT],
    // F_CCW_NEXT
    [F_START, F_CCW_BEGIN, F_CCW_FINAL, F_CCW_NEXT],
    // F_CCW_FINAL
    [F_START | DIR_CCW, F_START, F_CCW_FINAL, F_CCW_NEXT],
];

// Half-step states
const H_START: u8 = 0;
const H_CW_BEGIN: u8 = 1;
const H_CCW_BEGIN: u8 = 2;
const H_START_M: u8 = 3;
const H_CW_BEGIN_M: u8 = 4;
const H_CCW_BEGIN_M: u8 = 5;

const HALF_STEP: [[u8; 4]; 6] = [
    // H_START (rest at 00)
    [H_START, H_CCW_BEGIN, H_CW_BEGIN, H_START_M],
    // H_CW_BEGIN
    [H_START, H_START, H_CW_BEGIN, H_START_M | DIR_CW],
    // H_CCW_BEGIN
    [H_START, H_CCW_BEGIN, H_START, H_START_M | DIR_CCW],
    // H_START_M (rest at 11)
    [H_START, H_CW_BEGIN_M, H_CCW_BEGIN_M, H_START_M],
    // H_CW_BEGIN_M
    [H_START | DIR_CW, H_CW_BEGIN_M, H_START_M, H_START_M],
    // H_CCW_BEGIN_M
    [H_START | DIR_CCW, H_START_M, H_CCW_BEGIN_M, H_START_M],
];

/// Quadrature decoder state machine
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    options: EncoderOptions,
    table_state: u8,
    state: EncoderState,
}

impl QuadratureDecoder {
    pub const fn new(options: EncoderOptions) -> Self {
        Self {
            options,
            table_state: 0,
            state: EncoderState {
                position: 0,
                direction: Direction::NotSet,
            },
        }
    }

    /// Change options. The table restarts from its rest state; the position
    /// is kept.
    pub fn configure(&mut self, options: EncoderOptions) {
        self.options = options;
        self.table_state = 0;
    }

    pub fn options(&self) -> EncoderOptions {
        self.options
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = EncoderState::default();
    }

    /// Feed a pin sample. Returns the new state when a step was counted.
    pub fn update(&mut self, a: bool, b: bool) -> Option<EncoderState> {
        let pins = ((a as usize) << 1) | b as usize;
        let row = (self.table_state & STATE_MASK) as usize;
        let next = if self.options.half_steps {
            HALF_STEP[row][pins]
        } else {
            FULL_STEP[row][pins]
        };
        self.table_state = next & STATE_MASK;

        let clockwise = match next & (DIR_CW | DIR_CCW) {
            DIR_CW => true,
            DIR_CCW => false,
            _ => return None,
        };

        let direction = if clockwise != self.options.flip_direction {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        self.state.position = match direction {
            Direction::Clockwise => self.state.position.wrapping_add(1),
            _ => self.state.position.wrapping_sub(1),
        };
        self.state.direction = direction;

        Some(self.state)
    }
}
