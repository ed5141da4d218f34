//! Events delivered by the BLE stack
//!
//! Every GAP and GATT server callback the firmware cares about is one variant
//! of [`StackEvent`]. The stack side only enqueues these; the session owner
//! consumes them.

use heapless::Vec;

use crate::config::gatt::CHAR_VALUE_MAX_LEN;

/// Bluetooth device address
pub type BdAddr = [u8; 6];

/// Handle identifying the registered GATT server interface
pub type InterfaceHandle = u8;

/// Most handles a table-created event can carry
pub const MAX_REPORTED_HANDLES: usize = 8;

/// Completion status carried by stack confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed(u16),
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Raw status code (0 on success)
    pub fn code(self) -> u16 {
        match self {
            Status::Success => 0,
            Status::Failed(code) => code,
        }
    }
}

/// Attribute protocol status used in responses to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Ok,
    InvalidAttrLen,
}

impl GattStatus {
    /// ATT error code on the wire
    pub fn code(self) -> u8 {
        match self {
            GattStatus::Ok => 0x00,
            GattStatus::InvalidAttrLen => 0x0D,
        }
    }
}

/// A write request from the peer
///
/// The payload is captured up to the characteristic's maximum length. The
/// real length is kept separately so oversized writes can still be detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub conn_id: u16,
    pub trans_id: u32,
    pub handle: u16,
    pub len: usize,
    pub data: Vec<u8, CHAR_VALUE_MAX_LEN>,
    pub need_rsp: bool,
}

impl WriteRequest {
    pub fn new(conn_id: u16, trans_id: u32, handle: u16, value: &[u8], need_rsp: bool) -> Self {
        let captured = &value[..value.len().min(CHAR_VALUE_MAX_LEN)];
        let mut data = Vec::new();
        // Cannot fail, the slice is clamped to capacity
        let _ = data.extend_from_slice(captured);

        Self {
            conn_id,
            trans_id,
            handle,
            len: value.len(),
            data,
            need_rsp,
        }
    }
}

/// Event raised by the BLE stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// GATT server application registered
    Registered {
        status: Status,
        app_id: u16,
        interface: InterfaceHandle,
    },
    /// Attribute table creation finished
    TableCreated {
        status: Status,
        num_handle: u16,
        handles: Vec<u16, MAX_REPORTED_HANDLES>,
    },
    /// Service start finished
    ServiceStarted { status: Status, service_handle: u16 },
    /// Peer read request for an attribute answered by the application
    Read { conn_id: u16, trans_id: u32, handle: u16 },
    /// Peer write request
    Write(WriteRequest),
    /// Peer connected
    Connected {
        conn_id: u16,
        interface: InterfaceHandle,
        remote: BdAddr,
    },
    /// Peer disconnected
    Disconnected {
        conn_id: u16,
        remote: BdAddr,
        reason: u8,
    },
    /// Raw advertising data committed
    AdvDataSet { status: Status },
    /// Advertising start finished
    AdvStarted { status: Status },
    /// Advertising stop finished
    AdvStopped { status: Status },
    /// Connection parameters changed
    ConnParamsUpdated {
        status: Status,
        interval: u16,
        latency: u16,
        timeout: u16,
    },
    /// ATT MTU negotiated with the peer
    MtuExchanged { conn_id: u16, mtu: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_request_keeps_real_length() {
        let payload = [0xAAu8; 32];
        let req = WriteRequest::new(0, 1, 42, &payload, true);

        assert_eq!(req.len, 32);
        assert_eq!(req.data.len(), CHAR_VALUE_MAX_LEN);
    }

    #[test]
    fn test_write_request_small_payload() {
        let req = WriteRequest::new(0, 1, 42, &[0x01, 0x00], false);

        assert_eq!(req.len, 2);
        assert_eq!(req.data.as_slice(), &[0x01, 0x00]);
        assert!(!req.need_rsp);
    }

    #[test]
    fn test_status_codes() {
        assert!(Status::Success.is_success());
        assert!(!Status::Failed(0x85).is_success());
        assert_eq!(Status::Failed(0x85).code(), 0x85);
        assert_eq!(GattStatus::InvalidAttrLen.code(), 0x0D);
    }
}
