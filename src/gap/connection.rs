//! Connection / advertising state machine
//!
//! ```text
//! AdvertisingIdle --adv data set--> Advertising --connect--> Connected
//!                                        ^                        |
//!                                        +-------disconnect-------+
//! ```
//!
//! Only one peer is tracked. Disconnect always restarts advertising so the
//! device stays discoverable.

use crate::stack::{BdAddr, BleStack, InterfaceHandle, Status};

use super::advertising::{AdvParams, ConnParamsRequest};

/// The connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub conn_id: u16,
    pub interface: InterfaceHandle,
    pub remote: BdAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Stack is up, advertising not yet requested
    AdvertisingIdle,
    Advertising,
    Connected(ConnectionInfo),
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    params: AdvParams,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::AdvertisingIdle,
            params: AdvParams::DEFAULT,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection(&self) -> Option<ConnectionInfo> {
        match self.state {
            ConnectionState::Connected(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Advertising payload committed; start advertising
    pub fn on_adv_data_set<S: BleStack>(&mut self, stack: &mut S, status: Status) {
        log::info!("Advertising data set, status {}", status.code());
        self.start_advertising(stack);
    }

    pub fn on_adv_started(&mut self, status: Status) {
        if status.is_success() {
            log::info!("Advertising start successfully");
        } else {
            log::error!("Advertising start failed, status {}", status.code());
        }
    }

    pub fn on_adv_stopped(&mut self, status: Status) {
        if status.is_success() {
            log::info!("Advertising stop successfully");
        } else {
            log::error!("Advertising stop failed, status {}", status.code());
        }
    }

    /// Peer connected. The parameter update is advisory.
    pub fn on_connected<S: BleStack>(
        &mut self,
        stack: &mut S,
        conn_id: u16,
        interface: InterfaceHandle,
        remote: BdAddr,
    ) {
        log::info!("Connected, conn_id {}, remote {:02x?}", conn_id, remote);
        self.state = ConnectionState::Connected(ConnectionInfo {
            conn_id,
            interface,
            remote,
        });

        if let Err(e) = stack.update_conn_params(&ConnParamsRequest::for_peer(remote)) {
            log::warn!("Connection parameter update request failed: {}", e);
        }
    }

    /// Peer went away; back to advertising
    pub fn on_disconnected<S: BleStack>(&mut self, stack: &mut S, remote: BdAddr, reason: u8) {
        log::info!("Disconnected, remote {:02x?}, reason 0x{:02x}", remote, reason);
        self.state = ConnectionState::Advertising;
        self.start_advertising(stack);
    }

    pub fn on_conn_params_updated(&mut self, status: Status, interval: u16, latency: u16, timeout: u16) {
        log::info!(
            "Connection params update, status {}, conn_int {}, latency {}, timeout {}",
            status.code(),
            interval,
            latency,
            timeout
        );
    }

    fn start_advertising<S: BleStack>(&mut self, stack: &mut S) {
        match stack.start_advertising(&self.params) {
            Ok(()) => {
                if !self.is_connected() {
                    self.state = ConnectionState::Advertising;
                }
            }
            Err(e) => log::error!("Advertising start request failed: {}", e),
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::stack::traits::mock::{MockBleStack, StackCall};

    const PEER: BdAddr = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

    #[test]
    fn test_starts_idle() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.state(), ConnectionState::AdvertisingIdle);
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_adv_data_set_starts_advertising() {
        let mut stack = MockBleStack::new();
        let mut manager = ConnectionManager::new();

        manager.on_adv_data_set(&mut stack, Status::Success);
        assert_eq!(manager.state(), ConnectionState::Advertising);
        assert_eq!(stack.advertising_starts(), 1);

        // Confirmation does not move the state
        manager.on_adv_started(Status::Failed(0x0C));
        assert_eq!(manager.state(), ConnectionState::Advertising);
        assert_eq!(stack.advertising_starts(), 1);
    }

    #[test]
    fn test_connect_records_peer_and_requests_params() {
        let mut stack = MockBleStack::new();
        let mut manager = ConnectionManager::new();

        manager.on_connected(&mut stack, 7, 3, PEER);
        assert_eq!(
            manager.connection(),
            Some(ConnectionInfo {
                conn_id: 7,
                interface: 3,
                remote: PEER
            })
        );
        assert_eq!(stack.count(|c| *c == StackCall::UpdateConnParams { remote: PEER }), 1);
    }

    #[test]
    fn test_conn_param_failure_is_not_fatal() {
        let mut stack = MockBleStack::new();
        stack.set_next_conn_params_error(StackError::Rejected(0x0C));
        let mut manager = ConnectionManager::new();

        manager.on_connected(&mut stack, 7, 3, PEER);
        assert!(manager.is_connected());
    }

    #[test]
    fn test_disconnect_restarts_advertising() {
        let mut stack = MockBleStack::new();
        let mut manager = ConnectionManager::new();

        manager.on_connected(&mut stack, 7, 3, PEER);
        manager.on_disconnected(&mut stack, PEER, 0x13);
        assert_eq!(manager.state(), ConnectionState::Advertising);
        assert_eq!(manager.connection(), None);
        assert_eq!(stack.advertising_starts(), 1);
    }

    #[test]
    fn test_disconnect_state_even_if_restart_rejected() {
        let mut stack = MockBleStack::new();
        let mut manager = ConnectionManager::new();

        manager.on_connected(&mut stack, 7, 3, PEER);
        stack.set_next_advertising_error(StackError::QueueFull);
        manager.on_disconnected(&mut stack, PEER, 0x08);
        assert_eq!(manager.state(), ConnectionState::Advertising);
    }
}
