//! BLE stack boundary
//!
//! Events flow in as [`StackEvent`] values; requests flow out through the
//! [`BleStack`] trait.

pub mod events;
pub mod traits;

pub use events::{BdAddr, GattStatus, InterfaceHandle, StackEvent, Status, WriteRequest};
pub use traits::BleStack;
