//! Application task
//!
//! Owns the [`EventLoop`] and everything it holds. Stack events from the BLE
//! task are applied as they arrive; the loop ticks every
//! [`TASK_DELAY_MS`](crate::config::timing::TASK_DELAY_MS).

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};

use crate::ble::{ChannelStack, STACK_EVENTS};
use crate::config::timing::TASK_DELAY_MS;
use crate::encoder::Encoder;
use crate::event_loop::EventLoop;
use crate::io::{Button, Led};

/// Run the encoder application until bring-up fails
pub async fn app_task<E, B, L>(mut event_loop: EventLoop<ChannelStack, E, B, L>)
where
    E: Encoder,
    B: Button,
    L: Led,
{
    if let Err(e) = event_loop.start() {
        log::error!("{}", e);
        return;
    }
    log::info!("Encoder application started");

    let mut ticker = Ticker::every(Duration::from_millis(TASK_DELAY_MS));

    loop {
        match select(ticker.next(), STACK_EVENTS.receive()).await {
            Either::First(()) => {
                event_loop.tick();
            }
            Either::Second(event) => event_loop.handle_stack_event(event),
        }
    }
}
