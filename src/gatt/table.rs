//! Attribute table for the encoder service
//!
//! The table has exactly four entries:
//!
//! | Index | Attribute                   | UUID   | Value                         |
//! |-------|-----------------------------|--------|-------------------------------|
//! | 0     | Primary service declaration | 0x2800 | service UUID 0x00FF           |
//! | 1     | Characteristic declaration  | 0x2803 | properties READ \| NOTIFY     |
//! | 2     | Characteristic value        | 0xFF01 | 1 byte, max 20, app responds  |
//! | 3     | Client configuration (CCCD) | 0x2902 | `[0x00, 0x00]`                |
//!
//! Creation is asynchronous. The table only becomes usable once the stack
//! reports it was created with exactly four handles and then confirms the
//! service started. A failed creation is permanent.

use heapless::Vec;

use crate::config::gatt::{CHAR_UUID, CHAR_VALUE_MAX_LEN, NUM_HANDLE, SERVICE_UUID};
use crate::error::StackError;
use crate::stack::{BleStack, GattStatus, InterfaceHandle, Status, WriteRequest};

pub const PRIMARY_SERVICE_UUID: u16 = 0x2800;
pub const CHAR_DECLARATION_UUID: u16 = 0x2803;
pub const CLIENT_CONFIG_UUID: u16 = 0x2902;

/// Characteristic property bits
pub const CHAR_PROP_READ: u8 = 0x02;
pub const CHAR_PROP_NOTIFY: u8 = 0x10;

/// Attribute permission bits
pub const PERM_READ: u16 = 0x0001;
pub const PERM_WRITE: u16 = 0x0010;

pub const IDX_SERVICE: usize = 0;
pub const IDX_CHAR_DECL: usize = 1;
pub const IDX_CHAR_VALUE: usize = 2;
pub const IDX_CCCD: usize = 3;

/// CCCD value enabling notifications
const CCCD_NOTIFY: u16 = 0x0001;
/// CCCD value disabling notifications
const CCCD_NONE: u16 = 0x0000;

/// Who answers requests for an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// The stack answers from its stored value
    Auto,
    /// The request is forwarded to the application
    ByApp,
}

/// One entry of the attribute table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEntry {
    pub response: ResponseMode,
    pub uuid: u16,
    pub permissions: u16,
    pub max_len: u16,
    pub value: Vec<u8, CHAR_VALUE_MAX_LEN>,
}

impl AttributeEntry {
    fn new(response: ResponseMode, uuid: u16, permissions: u16, max_len: u16, value: &[u8]) -> Self {
        let mut stored = Vec::new();
        // All initial values are at most two bytes
        let _ = stored.extend_from_slice(value);
        Self {
            response,
            uuid,
            permissions,
            max_len,
            value: stored,
        }
    }
}

/// Definition handed to the stack when creating the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub entries: [AttributeEntry; NUM_HANDLE],
}

impl TableDefinition {
    /// The encoder service table
    pub fn encoder_service() -> Self {
        Self {
            entries: [
                AttributeEntry::new(
                    ResponseMode::Auto,
                    PRIMARY_SERVICE_UUID,
                    PERM_READ,
                    2,
                    &SERVICE_UUID.to_le_bytes(),
                ),
                AttributeEntry::new(
                    ResponseMode::Auto,
                    CHAR_DECLARATION_UUID,
                    PERM_READ,
                    1,
                    &[CHAR_PROP_READ | CHAR_PROP_NOTIFY],
                ),
                AttributeEntry::new(
                    ResponseMode::ByApp,
                    CHAR_UUID,
                    PERM_READ | PERM_WRITE,
                    CHAR_VALUE_MAX_LEN as u16,
                    &[0x00],
                ),
                AttributeEntry::new(
                    ResponseMode::Auto,
                    CLIENT_CONFIG_UUID,
                    PERM_READ | PERM_WRITE,
                    2,
                    &[0x00, 0x00],
                ),
            ],
        }
    }
}

/// Lifecycle of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Nothing requested yet
    Unregistered,
    /// Creation requested, waiting for the stack
    Requested,
    /// Created, service start requested
    Created([u16; NUM_HANDLE]),
    /// Service running, notifications allowed
    Started([u16; NUM_HANDLE]),
    /// Creation failed; the table stays unusable
    Failed,
}

/// Answer to a read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub handle: u16,
    pub value: Vec<u8, CHAR_VALUE_MAX_LEN>,
}

/// Result of processing a write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Status to answer the peer with
    pub status: GattStatus,
    /// New subscription state, if the write changed it
    pub subscription: Option<bool>,
}

/// Attribute table manager
#[derive(Debug)]
pub struct AttributeTable {
    state: TableState,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self {
            state: TableState::Unregistered,
        }
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// Build the table and ask the stack to create it
    pub fn build_and_register<S: BleStack>(
        &mut self,
        stack: &mut S,
        interface: InterfaceHandle,
    ) -> Result<(), StackError> {
        let definition = TableDefinition::encoder_service();
        match stack.create_attribute_table(interface, &definition) {
            Ok(()) => {
                self.state = TableState::Requested;
                Ok(())
            }
            Err(e) => {
                log::error!("create attr table failed: {}", e);
                self.state = TableState::Failed;
                Err(e)
            }
        }
    }

    /// Handle the stack's table-created report
    pub fn on_table_created<S: BleStack>(
        &mut self,
        stack: &mut S,
        status: Status,
        num_handle: u16,
        handles: &[u16],
    ) {
        if self.state == TableState::Failed {
            log::warn!("ignoring attribute table report after failed creation");
            return;
        }

        if !status.is_success() {
            log::error!("create attribute table failed, error code=0x{:x}", status.code());
            self.state = TableState::Failed;
            return;
        }

        if num_handle as usize != NUM_HANDLE || handles.len() != NUM_HANDLE {
            log::error!(
                "create attribute table abnormally, num_handle ({}) doesn't equal {}",
                num_handle,
                NUM_HANDLE
            );
            self.state = TableState::Failed;
            return;
        }

        let mut table = [0u16; NUM_HANDLE];
        table.copy_from_slice(handles);
        log::info!("create attribute table successfully, handles = {:?}", table);
        self.state = TableState::Created(table);

        if let Err(e) = stack.start_service(table[IDX_SERVICE]) {
            log::error!("start service failed: {}", e);
        }
    }

    /// Handle the stack's service-started confirmation
    pub fn on_service_started(&mut self, status: Status, service_handle: u16) {
        let handles = match self.state {
            TableState::Created(handles) | TableState::Started(handles) => handles,
            _ => {
                log::warn!("service start reported without a valid table (handle {})", service_handle);
                return;
            }
        };

        if !status.is_success() {
            log::error!("service start failed, status 0x{:x}", status.code());
            return;
        }

        log::info!("service started, service_handle {}", service_handle);
        self.state = TableState::Started(handles);
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, TableState::Started(_))
    }

    /// Handles of a created table
    pub fn handles(&self) -> Option<[u16; NUM_HANDLE]> {
        match self.state {
            TableState::Created(handles) | TableState::Started(handles) => Some(handles),
            _ => None,
        }
    }

    /// Characteristic value handle, `None` while unset
    pub fn value_handle(&self) -> Option<u16> {
        self.handles()
            .map(|handles| handles[IDX_CHAR_VALUE])
            .filter(|&handle| handle != 0)
    }

    pub fn cccd_handle(&self) -> Option<u16> {
        self.handles()
            .map(|handles| handles[IDX_CCCD])
            .filter(|&handle| handle != 0)
    }

    /// Answer a read request.
    ///
    /// Always a single 0x00 byte; the live zone is only ever pushed through
    /// notifications.
    pub fn handle_read(&self, handle: u16) -> ReadResponse {
        let mut value = Vec::new();
        let _ = value.push(0x00);
        ReadResponse { handle, value }
    }

    /// Process a write request
    pub fn handle_write(&self, request: &WriteRequest) -> WriteOutcome {
        if request.len > CHAR_VALUE_MAX_LEN {
            log::warn!(
                "write length {} exceeds maximum {}",
                request.len,
                CHAR_VALUE_MAX_LEN
            );
            return WriteOutcome {
                status: GattStatus::InvalidAttrLen,
                subscription: None,
            };
        }

        let mut subscription = None;
        if Some(request.handle) == self.cccd_handle() && request.len == 2 {
            let value = u16::from_le_bytes([request.data[0], request.data[1]]);
            match value {
                CCCD_NOTIFY => subscription = Some(true),
                CCCD_NONE => subscription = Some(false),
                other => log::debug!("ignoring CCCD value 0x{:04x}", other),
            }
        }

        WriteOutcome {
            status: GattStatus::Ok,
            subscription,
        }
    }
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}
