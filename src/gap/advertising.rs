//! Advertising payload and parameters

use crate::config::advertising::{
    ADV_DATA_MAX_LEN, DEVICE_NAME, INTERVAL_MAX, INTERVAL_MIN, TX_POWER_DBM,
};
use crate::config::connection;
use crate::stack::BdAddr;

/// AD type: flags
const AD_TYPE_FLAGS: u8 = 0x01;
/// AD type: complete local name
const AD_TYPE_NAME_CMPL: u8 = 0x09;
/// AD type: TX power level
const AD_TYPE_TX_PWR: u8 = 0x0A;

/// LE General Discoverable, BR/EDR not supported
const FLAGS_GENERAL_DISC_NO_BREDR: u8 = 0x06;

/// Raw advertising payload: flags, complete local name, TX power
pub const ADV_RAW_DATA: [u8; 19] = [
    0x02, AD_TYPE_FLAGS, FLAGS_GENERAL_DISC_NO_BREDR,
    0x0C, AD_TYPE_NAME_CMPL, b'B', b'L', b'E', b'_', b'E', b'n', b'c', b'o', b'd', b'e', b'r',
    0x02, AD_TYPE_TX_PWR, TX_POWER_DBM,
];

const _: () = assert!(ADV_RAW_DATA.len() <= ADV_DATA_MAX_LEN, "Advertising data too large");
const _: () = assert!(DEVICE_NAME.len() + 1 == ADV_RAW_DATA[3] as usize, "name length byte out of date");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvType {
    /// Connectable undirected
    ConnectableUndirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnAddrType {
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMap {
    /// Channels 37, 38 and 39
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Scan and connect requests from anyone
    AllowAny,
}

/// Advertising parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    /// Minimum interval in 0.625 ms units
    pub interval_min: u16,
    /// Maximum interval in 0.625 ms units
    pub interval_max: u16,
    pub adv_type: AdvType,
    pub own_addr_type: OwnAddrType,
    pub channel_map: ChannelMap,
    pub filter_policy: FilterPolicy,
}

impl AdvParams {
    pub const DEFAULT: Self = Self {
        interval_min: INTERVAL_MIN,
        interval_max: INTERVAL_MAX,
        adv_type: AdvType::ConnectableUndirected,
        own_addr_type: OwnAddrType::Public,
        channel_map: ChannelMap::All,
        filter_policy: FilterPolicy::AllowAny,
    };

    /// Minimum interval in microseconds
    pub fn interval_min_us(&self) -> u64 {
        self.interval_min as u64 * 625
    }

    /// Maximum interval in microseconds
    pub fn interval_max_us(&self) -> u64 {
        self.interval_max as u64 * 625
    }
}

impl Default for AdvParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Connection parameter update request sent after a peer connects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParamsRequest {
    pub remote: BdAddr,
    /// Minimum interval in 1.25 ms units
    pub min_interval: u16,
    /// Maximum interval in 1.25 ms units
    pub max_interval: u16,
    pub latency: u16,
    /// Supervision timeout in 10 ms units
    pub timeout: u16,
}

impl ConnParamsRequest {
    pub fn for_peer(remote: BdAddr) -> Self {
        Self {
            remote,
            min_interval: connection::MIN_INTERVAL,
            max_interval: connection::MAX_INTERVAL,
            latency: connection::LATENCY,
            timeout: connection::SUPERVISION_TIMEOUT,
        }
    }

    pub fn min_interval_us(&self) -> u64 {
        self.min_interval as u64 * 1250
    }

    pub fn max_interval_us(&self) -> u64 {
        self.max_interval as u64 * 1250
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout as u64 * 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_payload_layout() {
        assert_eq!(&ADV_RAW_DATA[..3], &[0x02, 0x01, 0x06]);
        assert_eq!(&ADV_RAW_DATA[5..16], DEVICE_NAME.as_bytes());
        assert_eq!(&ADV_RAW_DATA[16..], &[0x02, 0x0A, 0x09]);
    }

    #[test]
    fn test_adv_interval_is_20ms() {
        let params = AdvParams::default();
        assert_eq!(params.interval_min_us(), 20_000);
        assert_eq!(params.interval_max_us(), 20_000);
    }

    #[test]
    fn test_conn_params_request() {
        let request = ConnParamsRequest::for_peer([1, 2, 3, 4, 5, 6]);
        assert_eq!(request.latency, 0);
        assert_eq!(request.min_interval_us(), 20_000);
        assert_eq!(request.max_interval_us(), 40_000);
        assert_eq!(request.timeout_ms(), 4_000);
    }
}
