//! BLE task bridging trouble-host and the application
//!
//! The task owns the trouble-host stack. It executes [`BleCommand`]s from the
//! application and reports every outcome back as a [`StackEvent`]:
//!
//! 1. Bring-up commands are collected until the attribute table is requested,
//!    then the GATT server is built and its handles reported.
//! 2. Advertising runs on request; commands are still served while waiting
//!    for a central.
//! 3. While connected, reads of the zone value and all writes are forwarded
//!    to the application and answered from its [`GattReply`].

use core::pin::pin;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{with_timeout, Duration};
use heapless::{String, Vec};
use trouble_host::prelude::*;

use crate::ble::channels::{BleCommand, GattReply, MAX_NAME_LEN, BLE_COMMANDS, GATT_REPLY, STACK_EVENTS};
use crate::ble::service::{EncoderService, ZoneValue};
use crate::config::advertising::{ADV_DATA_MAX_LEN, DEVICE_NAME};
use crate::config::timing::GATT_REPLY_TIMEOUT_MS;
use crate::gap::{AdvParams, ConnParamsRequest};
use crate::stack::{GattStatus, InterfaceHandle, StackEvent, Status, WriteRequest};

/// Number of maximum concurrent connections
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels (signal + ATT)
const L2CAP_CHANNELS_MAX: usize = 2;

/// Interface handle reported for the single GATT server
const GATTS_INTERFACE: InterfaceHandle = 3;

/// Generic failure status reported for stack operations
const GATT_ERROR: u16 = 0x85;

/// BLE GATT server with the encoder service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    encoder: EncoderService,
}

/// Bring-up requests seen before the attribute table is created
struct Setup {
    name: String<MAX_NAME_LEN>,
    adv_data: Vec<u8, ADV_DATA_MAX_LEN>,
    pending_adv: Option<AdvParams>,
}

/// Main BLE task
pub async fn ble_task<C: Controller>(controller: C) {
    let setup = collect_setup().await;
    log::info!("BLE: building GATT server as '{}'", setup.name.as_str());

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();
    let stack = trouble_host::new(controller, &mut resources);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: setup.name.as_str(),
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(e) => {
            log::error!("BLE: GATT server creation failed: {:?}", e);
            emit(StackEvent::TableCreated {
                status: Status::Failed(GATT_ERROR),
                num_handle: 0,
                handles: Vec::new(),
            })
            .await;
            return;
        }
    };

    let value_handle = server.encoder.zone.handle;
    let cccd_handle = server.encoder.zone.cccd_handle.unwrap_or(0);
    if let Err(e) = server.set(&server.encoder.zone, &initial_value()) {
        log::warn!("BLE: initial value not set: {:?}", e);
    }

    // Same order as the attribute table: service, declaration, value, CCCD
    let mut handles = Vec::new();
    let _ = handles.extend_from_slice(&[
        server.encoder.handle,
        value_handle.saturating_sub(1),
        value_handle,
        cccd_handle,
    ]);
    emit(StackEvent::TableCreated {
        status: Status::Success,
        num_handle: handles.len() as u16,
        handles,
    })
    .await;

    let mut bridge = Bridge {
        stack: &stack,
        server: &server,
        value_handle,
        cccd_handle,
        adv_data: setup.adv_data,
        pending_adv: setup.pending_adv,
        trans_id: 0,
    };

    let runner_task = async {
        loop {
            if let Err(e) = runner.run().await {
                log::warn!("BLE: runner error: {:?}", e);
            }
        }
    };

    select(runner_task, bridge.run(&mut peripheral)).await;
}

/// Serve bring-up commands until the attribute table is requested
async fn collect_setup() -> Setup {
    let mut setup = Setup {
        name: String::try_from(DEVICE_NAME).unwrap_or_default(),
        adv_data: Vec::new(),
        pending_adv: None,
    };

    loop {
        match BLE_COMMANDS.receive().await {
            BleCommand::RegisterApp(app_id) => {
                emit(StackEvent::Registered {
                    status: Status::Success,
                    app_id,
                    interface: GATTS_INTERFACE,
                })
                .await;
            }
            BleCommand::SetDeviceName(name) => setup.name = name,
            BleCommand::SetLocalMtu(mtu) => {
                log::info!("BLE: local MTU {} requested, bounded by the packet pool", mtu);
            }
            BleCommand::ConfigureAdvData(data) => {
                setup.adv_data = data;
                emit(StackEvent::AdvDataSet {
                    status: Status::Success,
                })
                .await;
            }
            BleCommand::StartAdvertising(params) => setup.pending_adv = Some(params),
            BleCommand::CreateAttributeTable => return setup,
            other => log::warn!("BLE: {:?} before the attribute table exists", other),
        }
    }
}

struct Bridge<'a, 'values, C: Controller> {
    stack: &'a Stack<'values, C, DefaultPacketPool>,
    server: &'a Server<'values>,
    value_handle: u16,
    cccd_handle: u16,
    adv_data: Vec<u8, ADV_DATA_MAX_LEN>,
    pending_adv: Option<AdvParams>,
    trans_id: u32,
}

impl<'a, 'values, C: Controller> Bridge<'a, 'values, C> {
    async fn run(&mut self, peripheral: &mut Peripheral<'values, C, DefaultPacketPool>) {
        loop {
            let Some(params) = self.pending_adv.take() else {
                let command = BLE_COMMANDS.receive().await;
                self.idle_command(command).await;
                continue;
            };

            let advertiser = match peripheral
                .advertise(
                    &advertisement_parameters(&params),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &self.adv_data,
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => {
                    emit(StackEvent::AdvStarted {
                        status: Status::Success,
                    })
                    .await;
                    a
                }
                Err(e) => {
                    log::error!("BLE: advertising failed: {:?}", e);
                    emit(StackEvent::AdvStarted {
                        status: Status::Failed(GATT_ERROR),
                    })
                    .await;
                    continue;
                }
            };

            // Keep serving commands while waiting for a central
            let accepted = {
                let mut accept = pin!(advertiser.accept());
                loop {
                    match select(&mut accept, BLE_COMMANDS.receive()).await {
                        Either::First(result) => break result,
                        Either::Second(command) => self.idle_command(command).await,
                    }
                }
            };
            self.pending_adv = None;

            let conn = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    log::warn!("BLE: accept failed: {:?}", e);
                    self.pending_adv = Some(params);
                    continue;
                }
            };
            let conn = match conn.with_attribute_server(&**self.server) {
                Ok(conn) => conn,
                Err(e) => {
                    log::warn!("BLE: attaching attribute server failed: {:?}", e);
                    self.pending_adv = Some(params);
                    continue;
                }
            };

            self.serve(&conn).await;
        }
    }

    async fn serve(&mut self, conn: &GattConnection<'values, '_, DefaultPacketPool>) {
        let conn_id = conn.raw().handle().raw();
        let remote = conn.raw().peer_address().into_inner();
        emit(StackEvent::Connected {
            conn_id,
            interface: GATTS_INTERFACE,
            remote,
        })
        .await;

        let mut mtu = conn.raw().att_mtu();

        loop {
            match select(conn.next(), BLE_COMMANDS.receive()).await {
                Either::First(GattConnectionEvent::Disconnected { reason }) => {
                    emit(StackEvent::Disconnected {
                        conn_id,
                        remote,
                        reason: reason.into_inner(),
                    })
                    .await;
                    return;
                }
                Either::First(GattConnectionEvent::Gatt { event }) => {
                    self.on_gatt_event(conn_id, event).await;

                    let negotiated = conn.raw().att_mtu();
                    if negotiated != mtu {
                        mtu = negotiated;
                        emit(StackEvent::MtuExchanged { conn_id, mtu }).await;
                    }
                }
                Either::First(GattConnectionEvent::ConnectionParamsUpdated {
                    conn_interval,
                    peripheral_latency,
                    supervision_timeout,
                }) => {
                    emit(StackEvent::ConnParamsUpdated {
                        status: Status::Success,
                        interval: (conn_interval.as_micros() / 1250) as u16,
                        latency: peripheral_latency,
                        timeout: (supervision_timeout.as_millis() / 10) as u16,
                    })
                    .await;
                }
                Either::First(_) => {}
                Either::Second(command) => self.connected_command(conn, command).await,
            }
        }
    }

    async fn on_gatt_event(&mut self, conn_id: u16, event: GattEvent<'values, '_, DefaultPacketPool>) {
        match event {
            GattEvent::Read(read) if read.handle() == self.value_handle => {
                let trans_id = self.next_trans_id();
                let forwarded = StackEvent::Read {
                    conn_id,
                    trans_id,
                    handle: read.handle(),
                };

                let reply = match self.forward(forwarded, trans_id).await {
                    Some(GattReply {
                        status: GattStatus::Ok,
                        value,
                        ..
                    }) => {
                        if let Some(value) = value {
                            if let Err(e) = self.server.set(&self.server.encoder.zone, &value) {
                                log::warn!("BLE: read value not set: {:?}", e);
                            }
                        }
                        read.accept()
                    }
                    _ => read.reject(AttErrorCode::UNLIKELY_ERROR),
                };
                match reply {
                    Ok(reply) => reply.send().await,
                    Err(e) => log::warn!("BLE: error sending read response: {:?}", e),
                }
            }
            GattEvent::Write(write)
                if write.handle() == self.value_handle || write.handle() == self.cccd_handle =>
            {
                let trans_id = self.next_trans_id();
                let request = WriteRequest::new(conn_id, trans_id, write.handle(), write.data(), true);

                let reply = match self.forward(StackEvent::Write(request), trans_id).await {
                    Some(GattReply {
                        status: GattStatus::Ok,
                        ..
                    }) => write.accept(),
                    Some(GattReply {
                        status: GattStatus::InvalidAttrLen,
                        ..
                    }) => write.reject(AttErrorCode::INVALID_ATTRIBUTE_VALUE_LENGTH),
                    None => write.reject(AttErrorCode::UNLIKELY_ERROR),
                };
                match reply {
                    Ok(reply) => reply.send().await,
                    Err(e) => log::warn!("BLE: error sending write response: {:?}", e),
                }
            }
            other => match other.accept() {
                Ok(reply) => reply.send().await,
                Err(e) => log::warn!("BLE: error sending response: {:?}", e),
            },
        }
    }

    /// Hand a request to the application and wait for its answer
    async fn forward(&self, event: StackEvent, trans_id: u32) -> Option<GattReply> {
        GATT_REPLY.reset();
        emit(event).await;

        loop {
            match with_timeout(Duration::from_millis(GATT_REPLY_TIMEOUT_MS), GATT_REPLY.wait()).await {
                Ok(reply) if reply.trans_id == trans_id => return Some(reply),
                Ok(stale) => log::debug!("BLE: dropping stale reply {}", stale.trans_id),
                Err(_) => {
                    log::warn!("BLE: no reply for transaction {}", trans_id);
                    return None;
                }
            }
        }
    }

    async fn connected_command(
        &mut self,
        conn: &GattConnection<'values, '_, DefaultPacketPool>,
        command: BleCommand,
    ) {
        match command {
            BleCommand::Notify { handle, value, .. } if handle == self.value_handle => {
                if let Err(e) = self.server.encoder.zone.notify(conn, &value).await {
                    log::error!("BLE: notify failed: {:?}", e);
                }
            }
            BleCommand::Notify { handle, .. } => {
                log::warn!("BLE: notify on unknown handle {}", handle);
            }
            BleCommand::UpdateConnParams(request) => {
                if let Err(e) = conn
                    .raw()
                    .update_connection_params(self.stack, &connect_params(&request))
                    .await
                {
                    log::warn!("BLE: connection parameter update failed: {:?}", e);
                }
            }
            other => self.idle_command(other).await,
        }
    }

    /// Commands that do not need a connection
    async fn idle_command(&mut self, command: BleCommand) {
        match command {
            BleCommand::RegisterApp(app_id) => {
                emit(StackEvent::Registered {
                    status: Status::Success,
                    app_id,
                    interface: GATTS_INTERFACE,
                })
                .await;
            }
            BleCommand::StartService(service_handle) => {
                let status = if service_handle == self.server.encoder.handle {
                    Status::Success
                } else {
                    Status::Failed(GATT_ERROR)
                };
                emit(StackEvent::ServiceStarted {
                    status,
                    service_handle,
                })
                .await;
            }
            BleCommand::StartAdvertising(params) => self.pending_adv = Some(params),
            BleCommand::ConfigureAdvData(data) => {
                self.adv_data = data;
                emit(StackEvent::AdvDataSet {
                    status: Status::Success,
                })
                .await;
            }
            BleCommand::Notify { .. } | BleCommand::UpdateConnParams(_) => {
                log::debug!("BLE: dropping connection command while not connected");
            }
            other => log::warn!("BLE: {:?} is not supported after bring-up", other),
        }
    }

    fn next_trans_id(&mut self) -> u32 {
        self.trans_id = self.trans_id.wrapping_add(1);
        self.trans_id
    }
}

async fn emit(event: StackEvent) {
    STACK_EVENTS.send(event).await;
}

fn initial_value() -> ZoneValue {
    let mut value = ZoneValue::new();
    let _ = value.push(0x00);
    value
}

fn advertisement_parameters(params: &AdvParams) -> AdvertisementParameters {
    AdvertisementParameters {
        interval_min: Duration::from_micros(params.interval_min_us()),
        interval_max: Duration::from_micros(params.interval_max_us()),
        ..Default::default()
    }
}

fn connect_params(request: &ConnParamsRequest) -> ConnectParams {
    ConnectParams {
        min_connection_interval: Duration::from_micros(request.min_interval_us()),
        max_connection_interval: Duration::from_micros(request.max_interval_us()),
        max_latency: request.latency,
        supervision_timeout: Duration::from_millis(request.timeout_ms()),
        ..Default::default()
    }
}
