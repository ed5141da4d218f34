//! The cooperative application loop
//!
//! Each tick either drains one encoder event (LED only) or polls the encoder
//! state and runs zone detection, notification and the reset check. The
//! button is sampled on every tick regardless. Stack events are applied
//! between ticks by the same owner.

use crate::config::encoder::RESET_AT;
use crate::encoder::{Encoder, EncoderEvent, EncoderOptions};
use crate::error::StartError;
use crate::io::{Button, ButtonEdge, ButtonTracker, Led};
use crate::session::Session;
use crate::stack::{BleStack, StackEvent};
use crate::zone::ZoneThresholds;

/// Loop behaviour fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Reset the encoder once |position| reaches this. 0 or less disables it.
    pub reset_at: i32,
    pub thresholds: ZoneThresholds,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            reset_at: RESET_AT,
            thresholds: ZoneThresholds::DEFAULT,
        }
    }
}

/// Which branch a tick took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickBranch {
    /// An encoder event was consumed; zone logic skipped
    DrainedEvent,
    /// The encoder state was polled
    Polled,
}

pub struct EventLoop<S, E, B, L> {
    session: Session,
    stack: S,
    encoder: E,
    button: B,
    led: L,
    button_tracker: ButtonTracker,
    config: LoopConfig,
}

impl<S, E, B, L> EventLoop<S, E, B, L>
where
    S: BleStack,
    E: Encoder,
    B: Button,
    L: Led,
{
    pub fn new(stack: S, encoder: E, button: B, led: L, config: LoopConfig) -> Self {
        Self {
            session: Session::new(),
            stack,
            encoder,
            button,
            led,
            button_tracker: ButtonTracker::new(),
            config,
        }
    }

    /// Bring up the BLE session and configure the encoder
    pub fn start(&mut self) -> Result<(), StartError> {
        self.session.start(&mut self.stack)?;
        self.encoder
            .configure(&EncoderOptions::default())
            .inspect_err(|e| log::error!("encoder configure failed: {}", e))?;
        Ok(())
    }

    pub fn handle_stack_event(&mut self, event: StackEvent) {
        self.session.handle_stack_event(&mut self.stack, event);
    }

    /// Run one tick
    pub fn tick(&mut self) -> TickBranch {
        let branch = match self.encoder.poll_nonblocking() {
            Some(event) => {
                self.process_event(event);
                TickBranch::DrainedEvent
            }
            None => {
                self.poll_encoder();
                TickBranch::Polled
            }
        };

        self.sample_button();
        branch
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn button(&self) -> &B {
        &self.button
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    fn process_event(&mut self, event: EncoderEvent) {
        log::info!(
            "Event: position {}, direction {}",
            event.state.position,
            event.state.direction.as_str()
        );
        self.show_position(event.state.position);
    }

    fn poll_encoder(&mut self) {
        let state = match self.encoder.current_state() {
            Ok(state) => state,
            Err(e) => {
                log::error!("encoder state read failed: {}", e);
                return;
            }
        };
        let position = state.position;

        self.show_position(position);

        let zone = self.config.thresholds.zone_of(position);
        self.session.on_zone_observed(&mut self.stack, zone);

        if self.config.reset_at > 0 && position.unsigned_abs() >= self.config.reset_at.unsigned_abs() {
            log::info!("Reset due to position limit");
            if let Err(e) = self.encoder.reset() {
                log::error!("encoder reset failed: {}", e);
            }
        }
    }

    fn show_position(&mut self, position: i32) {
        let color = self.config.thresholds.zone_of(position).led_color();
        if let Err(e) = self.led.set_color(color) {
            log::warn!("LED update failed: {}", e);
        }
    }

    fn sample_button(&mut self) {
        let pressed = match self.button.is_pressed() {
            Ok(pressed) => pressed,
            Err(e) => {
                log::warn!("button read failed: {}", e);
                return;
            }
        };

        match self.button_tracker.update(pressed) {
            Some(ButtonEdge::Pressed) => {
                log::info!("Button Pressed! Setting zero point");
                if let Err(e) = self.encoder.reset() {
                    log::error!("encoder reset failed: {}", e);
                }
            }
            Some(ButtonEdge::Released) => log::info!("Button Released!"),
            None => {}
        }
    }
}
