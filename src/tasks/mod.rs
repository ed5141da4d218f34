//! Embassy tasks module
//!
//! The BLE task drives trouble-host; the application task owns the event loop.

pub mod app;
pub mod ble;

pub use app::app_task;
pub use ble::ble_task;
