//! Channels between the application task and the BLE task
//!
//! ```text
//! app task --BLE_COMMANDS--> BLE task
//! app task <--STACK_EVENTS-- BLE task
//! app task ---GATT_REPLY---> BLE task   (answer to a forwarded read/write)
//! ```
//!
//! [`ChannelStack`] is the application's [`BleStack`]: every request becomes a
//! [`BleCommand`] and never blocks. A full queue is reported as
//! [`StackError::QueueFull`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::{String, Vec};

use crate::config::advertising::ADV_DATA_MAX_LEN;
use crate::config::gatt::CHAR_VALUE_MAX_LEN;
use crate::error::StackError;
use crate::gap::{AdvParams, ConnParamsRequest};
use crate::gatt::{ReadResponse, TableDefinition};
use crate::stack::{BleStack, GattStatus, InterfaceHandle, StackEvent};

/// Longest device name accepted
pub const MAX_NAME_LEN: usize = 29;

const COMMAND_QUEUE_SIZE: usize = 8;
const EVENT_QUEUE_SIZE: usize = 8;

/// Request from the application to the BLE task
#[derive(Debug, Clone)]
pub enum BleCommand {
    RegisterApp(u16),
    SetDeviceName(String<MAX_NAME_LEN>),
    SetLocalMtu(u16),
    ConfigureAdvData(Vec<u8, ADV_DATA_MAX_LEN>),
    CreateAttributeTable,
    StartService(u16),
    StartAdvertising(AdvParams),
    UpdateConnParams(ConnParamsRequest),
    Notify {
        conn_id: u16,
        handle: u16,
        value: Vec<u8, CHAR_VALUE_MAX_LEN>,
    },
}

/// Application answer to a forwarded read or write
#[derive(Debug, Clone)]
pub struct GattReply {
    pub trans_id: u32,
    pub status: GattStatus,
    pub value: Option<Vec<u8, CHAR_VALUE_MAX_LEN>>,
}

pub static BLE_COMMANDS: Channel<CriticalSectionRawMutex, BleCommand, COMMAND_QUEUE_SIZE> =
    Channel::new();

pub static STACK_EVENTS: Channel<CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_SIZE> =
    Channel::new();

pub static GATT_REPLY: Signal<CriticalSectionRawMutex, GattReply> = Signal::new();

/// [`BleStack`] backed by the command channel
pub struct ChannelStack;

impl ChannelStack {
    fn send(&self, command: BleCommand) -> Result<(), StackError> {
        BLE_COMMANDS
            .try_send(command)
            .map_err(|_| StackError::QueueFull)
    }
}

impl BleStack for ChannelStack {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        self.send(BleCommand::RegisterApp(app_id))
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        let name = String::try_from(name).map_err(|_| StackError::InvalidArgument)?;
        self.send(BleCommand::SetDeviceName(name))
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        self.send(BleCommand::SetLocalMtu(mtu))
    }

    fn configure_adv_data(&mut self, data: &[u8]) -> Result<(), StackError> {
        let data = Vec::from_slice(data).map_err(|_| StackError::InvalidArgument)?;
        self.send(BleCommand::ConfigureAdvData(data))
    }

    fn create_attribute_table(
        &mut self,
        _interface: InterfaceHandle,
        _table: &TableDefinition,
    ) -> Result<(), StackError> {
        // The table layout is fixed by the GATT server definition
        self.send(BleCommand::CreateAttributeTable)
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        self.send(BleCommand::StartService(service_handle))
    }

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError> {
        self.send(BleCommand::StartAdvertising(*params))
    }

    fn update_conn_params(&mut self, params: &ConnParamsRequest) -> Result<(), StackError> {
        self.send(BleCommand::UpdateConnParams(*params))
    }

    fn send_notification(
        &mut self,
        _interface: InterfaceHandle,
        conn_id: u16,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError> {
        let value = Vec::from_slice(value).map_err(|_| StackError::InvalidArgument)?;
        self.send(BleCommand::Notify {
            conn_id,
            handle,
            value,
        })
    }

    fn send_response(
        &mut self,
        _interface: InterfaceHandle,
        _conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: Option<&ReadResponse>,
    ) -> Result<(), StackError> {
        GATT_REPLY.signal(GattReply {
            trans_id,
            status,
            value: response.map(|rsp| rsp.value.clone()),
        });
        Ok(())
    }
}
