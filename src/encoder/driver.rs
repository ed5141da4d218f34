//! Interrupt-driven rotary encoder driver
//!
//! A sampling task waits for an edge on either channel, feeds the pin levels
//! to the shared [`QuadratureDecoder`] and queues an [`EncoderEvent`] for
//! every counted step. The application side reads the same shared state
//! through [`SharedEncoder`].

use core::cell::RefCell;

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

use crate::config::encoder::{ENABLE_HALF_STEPS, EVENT_QUEUE_SIZE, FLIP_DIRECTION};
use crate::error::EncoderError;

use super::quadrature::QuadratureDecoder;
use super::traits::{Encoder, EncoderEvent, EncoderOptions, EncoderState};

/// Decoder state shared between the sampling task and the application
pub struct EncoderShared {
    decoder: Mutex<CriticalSectionRawMutex, RefCell<QuadratureDecoder>>,
    events: Channel<CriticalSectionRawMutex, EncoderEvent, EVENT_QUEUE_SIZE>,
}

impl EncoderShared {
    pub const fn new() -> Self {
        Self {
            decoder: Mutex::new(RefCell::new(QuadratureDecoder::new(EncoderOptions {
                half_steps: ENABLE_HALF_STEPS,
                flip_direction: FLIP_DIRECTION,
            }))),
            events: Channel::new(),
        }
    }

    fn sample(&self, a: bool, b: bool) {
        let counted = self.decoder.lock(|decoder| decoder.borrow_mut().update(a, b));
        if let Some(state) = counted {
            // Position is already updated; a full queue only loses the event
            if self.events.try_send(EncoderEvent { state }).is_err() {
                log::debug!("encoder event queue full, dropping event");
            }
        }
    }
}

/// The board's encoder state
pub static ENCODER: EncoderShared = EncoderShared::new();

/// Application handle onto the shared encoder state
#[derive(Clone, Copy)]
pub struct SharedEncoder {
    shared: &'static EncoderShared,
}

impl SharedEncoder {
    pub fn new(shared: &'static EncoderShared) -> Self {
        Self { shared }
    }
}

impl Encoder for SharedEncoder {
    fn configure(&mut self, options: &EncoderOptions) -> Result<(), EncoderError> {
        self.shared
            .decoder
            .lock(|decoder| decoder.borrow_mut().configure(*options));
        Ok(())
    }

    fn poll_nonblocking(&mut self) -> Option<EncoderEvent> {
        self.shared.events.try_receive().ok()
    }

    fn current_state(&self) -> Result<EncoderState, EncoderError> {
        self.shared
            .decoder
            .lock(|decoder| decoder.try_borrow().map(|d| d.state()))
            .map_err(|_| EncoderError::Unavailable)
    }

    fn reset(&mut self) -> Result<(), EncoderError> {
        self.shared.decoder.lock(|decoder| decoder.borrow_mut().reset());
        Ok(())
    }
}

/// Sample both encoder channels on every edge
pub async fn encoder_task<A, B>(mut pin_a: A, mut pin_b: B, shared: &'static EncoderShared)
where
    A: InputPin + Wait,
    B: InputPin + Wait,
{
    log::info!("Encoder sampling started");

    loop {
        let _ = select(pin_a.wait_for_any_edge(), pin_b.wait_for_any_edge()).await;

        let (Ok(a), Ok(b)) = (pin_a.is_high(), pin_b.is_high()) else {
            log::warn!("encoder pin read failed");
            continue;
        };
        shared.sample(a, b);
    }
}
