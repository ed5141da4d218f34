//! Bluetooth Low Energy glue for trouble-host
//!
//! The GATT service definition plus the channels and [`ChannelStack`] that
//! connect the application task to the BLE task.

pub mod channels;
pub mod service;

pub use channels::{BleCommand, ChannelStack, GattReply, BLE_COMMANDS, GATT_REPLY, STACK_EVENTS};
pub use service::EncoderService;
