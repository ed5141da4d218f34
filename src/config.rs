//! Hardware and protocol configuration constants for the ESP32-S3 encoder board
//!
//! Everything here is fixed at build time. Change a value and reflash.

/// GPIO assignments
pub mod pins {
    /// Rotary encoder channel A
    pub const ROT_ENC_A: u8 = 8;
    /// Rotary encoder channel B
    pub const ROT_ENC_B: u8 = 9;
    /// Zero-point button (active low, internal pull-up)
    pub const BUTTON: u8 = 10;
    pub const RED_LED: u8 = 2;
    pub const GREEN_LED: u8 = 1;
    pub const BLUE_LED: u8 = 0;
}

/// Rotary encoder options
pub mod encoder {
    /// Count at half-detent resolution
    pub const ENABLE_HALF_STEPS: bool = false;

    /// Reset the position to zero once |position| reaches this value.
    /// 0 disables the reset.
    pub const RESET_AT: i32 = 0;

    /// Reverse the clockwise/counter-clockwise sense
    pub const FLIP_DIRECTION: bool = false;

    /// Depth of the hardware event queue
    pub const EVENT_QUEUE_SIZE: usize = 8;
}

/// Position thresholds for the zones
pub mod zones {
    pub const GREEN_ZONE_MIN: i32 = -5;
    pub const GREEN_ZONE_MAX: i32 = 5;
    pub const YELLOW_ZONE_MIN: i32 = -10;
    pub const YELLOW_ZONE_MAX: i32 = 10;
}

/// Scheduling
pub mod timing {
    /// Event loop period in milliseconds
    pub const TASK_DELAY_MS: u64 = 50;

    /// How long the BLE task waits for the application to answer a GATT request
    pub const GATT_REPLY_TIMEOUT_MS: u64 = 500;
}

/// GATT server layout
pub mod gatt {
    /// Application identifier used when registering with the stack
    pub const APP_ID: u16 = 0;

    pub const SERVICE_UUID: u16 = 0x00FF;
    pub const CHAR_UUID: u16 = 0xFF01;

    /// Number of attributes in the table (service, declaration, value, CCCD)
    pub const NUM_HANDLE: usize = 4;

    /// Maximum characteristic value length
    pub const CHAR_VALUE_MAX_LEN: usize = 20;

    /// Local MTU requested at bring-up
    pub const LOCAL_MTU: u16 = 500;
}

/// Advertising
pub mod advertising {
    pub const DEVICE_NAME: &str = "BLE_Encoder";

    /// Advertising interval in 0.625 ms units (0x20 = 20 ms)
    pub const INTERVAL_MIN: u16 = 0x20;
    pub const INTERVAL_MAX: u16 = 0x20;

    /// Legacy advertising payload limit
    pub const ADV_DATA_MAX_LEN: usize = 31;

    /// Advertised TX power level in dBm
    pub const TX_POWER_DBM: u8 = 0x09;
}

/// Connection parameters requested after a peer connects
pub mod connection {
    /// Minimum connection interval in 1.25 ms units
    pub const MIN_INTERVAL: u16 = 0x10;
    /// Maximum connection interval in 1.25 ms units
    pub const MAX_INTERVAL: u16 = 0x20;
    pub const LATENCY: u16 = 0;
    /// Supervision timeout in 10 ms units (4 s)
    pub const SUPERVISION_TIMEOUT: u16 = 400;
}
