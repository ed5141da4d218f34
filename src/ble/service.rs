//! Encoder GATT service definition
//!
//! - Service UUID: 0x00FF
//! - Zone characteristic: 0xFF01 (read, notify, up to 20 bytes, CCCD)
//!
//! Only the CCCD is writable from the peer side.
//!
//! 16-bit UUIDs are written out on the Bluetooth base UUID.

use heapless::Vec;
use trouble_host::prelude::*;

use crate::config::gatt::CHAR_VALUE_MAX_LEN;

/// Variable-length characteristic value
pub type ZoneValue = Vec<u8, CHAR_VALUE_MAX_LEN>;

/// Encoder zone service
#[gatt_service(uuid = "000000ff-0000-1000-8000-00805f9b34fb")]
pub struct EncoderService {
    /// Zone characteristic. Reads are answered by the application.
    #[characteristic(uuid = "0000ff01-0000-1000-8000-00805f9b34fb", read, notify)]
    pub zone: ZoneValue,
}
