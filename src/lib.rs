#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod event_loop;
pub mod gap;
pub mod gatt;
pub mod io;
pub mod notifier;
pub mod session;
pub mod stack;
pub mod zone;

// These modules depend on embassy/async features only available with embedded feature
#[cfg(feature = "embedded")]
pub mod ble;
#[cfg(feature = "embedded")]
pub mod tasks;
