//! BLE stack command interface
//!
//! The session talks to the radio only through [`BleStack`]. Every request is
//! fire-and-forget: the result of an operation arrives later as a
//! [`StackEvent`](super::StackEvent), and the `Result` returned here only says
//! whether the request was accepted. This lets the real trouble-host bridge be
//! swapped with a recording mock for testing.

use crate::error::StackError;
use crate::gap::{AdvParams, ConnParamsRequest};
use crate::gatt::table::{ReadResponse, TableDefinition};

use super::events::{GattStatus, InterfaceHandle};

/// Abstract BLE stack interface for testability
pub trait BleStack {
    /// Register the GATT server application
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError>;

    /// Set the GAP device name
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError>;

    /// Set the local ATT MTU offered to peers
    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError>;

    /// Commit the raw advertising payload
    fn configure_adv_data(&mut self, data: &[u8]) -> Result<(), StackError>;

    /// Ask the stack to create the attribute table
    fn create_attribute_table(
        &mut self,
        interface: InterfaceHandle,
        table: &TableDefinition,
    ) -> Result<(), StackError>;

    /// Start the service whose declaration has the given handle
    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError>;

    /// Start (or restart) advertising
    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError>;

    /// Ask the peer for new connection parameters
    fn update_conn_params(&mut self, params: &ConnParamsRequest) -> Result<(), StackError>;

    /// Send an unacknowledged notification
    fn send_notification(
        &mut self,
        interface: InterfaceHandle,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError>;

    /// Answer a read or write request
    fn send_response(
        &mut self,
        interface: InterfaceHandle,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: Option<&ReadResponse>,
    ) -> Result<(), StackError>;
}
