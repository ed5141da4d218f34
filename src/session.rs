//! The BLE session
//!
//! One [`Session`] value owns every piece of mutable BLE state: the attribute
//! table, the connection, the subscription and the last announced zone. It is
//! owned by a single task, which feeds it stack events and zone observations.
//! Nothing else writes to it.

use crate::config::advertising::DEVICE_NAME;
use crate::config::gatt::{APP_ID, LOCAL_MTU};
use crate::error::StackError;
use crate::gap::{ConnectionManager, ConnectionState, ADV_RAW_DATA};
use crate::gatt::{AttributeTable, ReadResponse, SubscriptionGate};
use crate::notifier::{Notifier, NotifyOutcome};
use crate::stack::{BleStack, GattStatus, InterfaceHandle, StackEvent, WriteRequest};
use crate::zone::{Zone, ZoneTracker};

pub struct Session {
    interface: Option<InterfaceHandle>,
    table: AttributeTable,
    connection: ConnectionManager,
    gate: SubscriptionGate,
    tracker: ZoneTracker,
}

impl Session {
    pub fn new() -> Self {
        Self {
            interface: None,
            table: AttributeTable::new(),
            connection: ConnectionManager::new(),
            gate: SubscriptionGate::new(),
            tracker: ZoneTracker::new(),
        }
    }

    /// Bring the stack up: register the server, name the device, set the
    /// local MTU and commit the advertising payload.
    ///
    /// Any failure here is fatal and returned to the caller.
    pub fn start<S: BleStack>(&mut self, stack: &mut S) -> Result<(), StackError> {
        stack
            .register_app(APP_ID)
            .inspect_err(|e| log::error!("gatts app register error: {}", e))?;
        stack
            .set_device_name(DEVICE_NAME)
            .inspect_err(|e| log::error!("set device name failed: {}", e))?;
        stack
            .set_local_mtu(LOCAL_MTU)
            .inspect_err(|e| log::error!("set local MTU failed: {}", e))?;
        stack
            .configure_adv_data(&ADV_RAW_DATA)
            .inspect_err(|e| log::error!("config raw adv data failed: {}", e))?;

        log::info!("BLE session started as {}", DEVICE_NAME);
        Ok(())
    }

    /// Apply one stack event
    pub fn handle_stack_event<S: BleStack>(&mut self, stack: &mut S, event: StackEvent) {
        match event {
            StackEvent::Registered {
                status,
                app_id,
                interface,
            } => {
                if !status.is_success() {
                    log::error!("reg app failed, app_id {:04x}, status {}", app_id, status.code());
                    return;
                }
                if app_id != APP_ID {
                    log::warn!("registration for unknown app_id {:04x}", app_id);
                    return;
                }
                log::info!("GATT server registered, interface {}", interface);
                self.interface = Some(interface);
                // Failure is logged and leaves the table unusable
                let _ = self.table.build_and_register(stack, interface);
            }
            StackEvent::TableCreated {
                status,
                num_handle,
                handles,
            } => {
                self.table.on_table_created(stack, status, num_handle, &handles);
            }
            StackEvent::ServiceStarted {
                status,
                service_handle,
            } => {
                self.table.on_service_started(status, service_handle);
            }
            StackEvent::Read {
                conn_id,
                trans_id,
                handle,
            } => {
                log::debug!("read request, conn_id {}, handle {}", conn_id, handle);
                let response = self.table.handle_read(handle);
                self.respond(stack, conn_id, trans_id, GattStatus::Ok, Some(&response));
            }
            StackEvent::Write(request) => self.on_write(stack, request),
            StackEvent::Connected {
                conn_id,
                interface,
                remote,
            } => {
                self.connection.on_connected(stack, conn_id, interface, remote);
            }
            StackEvent::Disconnected {
                conn_id: _,
                remote,
                reason,
            } => {
                self.gate.clear();
                self.connection.on_disconnected(stack, remote, reason);
            }
            StackEvent::AdvDataSet { status } => self.connection.on_adv_data_set(stack, status),
            StackEvent::AdvStarted { status } => self.connection.on_adv_started(status),
            StackEvent::AdvStopped { status } => self.connection.on_adv_stopped(status),
            StackEvent::ConnParamsUpdated {
                status,
                interval,
                latency,
                timeout,
            } => {
                self.connection
                    .on_conn_params_updated(status, interval, latency, timeout);
            }
            StackEvent::MtuExchanged { conn_id, mtu } => {
                log::info!("MTU exchange, conn_id {}, MTU {}", conn_id, mtu);
            }
        }
    }

    /// Feed the zone seen on a poll tick.
    ///
    /// Returns the notification outcome when the zone changed and the
    /// service is running, `None` otherwise.
    pub fn on_zone_observed<S: BleStack>(&mut self, stack: &mut S, zone: Zone) -> Option<NotifyOutcome> {
        let changed = self.tracker.observe(zone, self.table.is_started())?;
        log::info!("zone changed to {}", changed.name());

        Some(Notifier::notify(
            stack,
            &self.table,
            &self.connection,
            &self.gate,
            changed,
        ))
    }

    pub fn table(&self) -> &AttributeTable {
        &self.table
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_subscribed(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn previous_zone(&self) -> Option<Zone> {
        self.tracker.previous()
    }

    fn on_write<S: BleStack>(&mut self, stack: &mut S, request: WriteRequest) {
        log::debug!(
            "write request, conn_id {}, handle {}, len {}",
            request.conn_id,
            request.handle,
            request.len
        );
        let outcome = self.table.handle_write(&request);
        if let Some(enabled) = outcome.subscription {
            self.gate.set(enabled);
        }
        if request.need_rsp {
            self.respond(stack, request.conn_id, request.trans_id, outcome.status, None);
        }
    }

    fn respond<S: BleStack>(
        &self,
        stack: &mut S,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        response: Option<&ReadResponse>,
    ) {
        let Some(interface) = self.interface else {
            log::warn!("request before registration, conn_id {}", conn_id);
            return;
        };
        if let Err(e) = stack.send_response(interface, conn_id, trans_id, status, response) {
            log::error!("send response error: {}", e);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::TableState;
    use crate::notifier::RefusalReason;
    use crate::stack::traits::mock::{MockBleStack, StackCall};
    use crate::stack::Status;
    use crate::zone::zone_of;
    use heapless::Vec;

    const PEER: [u8; 6] = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5];
    const HANDLES: [u16; 4] = [40, 41, 42, 43];
    const IFACE: InterfaceHandle = 3;

    fn handles(list: &[u16]) -> Vec<u16, 8> {
        Vec::from_slice(list).unwrap()
    }

    fn registered(session: &mut Session, stack: &mut MockBleStack) {
        session.start(stack).unwrap();
        session.handle_stack_event(
            stack,
            StackEvent::Registered {
                status: Status::Success,
                app_id: APP_ID,
                interface: IFACE,
            },
        );
    }

    /// Registered, table started, advertising
    fn started(session: &mut Session, stack: &mut MockBleStack) {
        registered(session, stack);
        session.handle_stack_event(
            stack,
            StackEvent::TableCreated {
                status: Status::Success,
                num_handle: 4,
                handles: handles(&HANDLES),
            },
        );
        session.handle_stack_event(
            stack,
            StackEvent::ServiceStarted {
                status: Status::Success,
                service_handle: HANDLES[0],
            },
        );
        session.handle_stack_event(stack, StackEvent::AdvDataSet { status: Status::Success });
    }

    fn connect(session: &mut Session, stack: &mut MockBleStack) {
        session.handle_stack_event(
            stack,
            StackEvent::Connected {
                conn_id: 1,
                interface: IFACE,
                remote: PEER,
            },
        );
    }

    fn write_cccd(session: &mut Session, stack: &mut MockBleStack, value: [u8; 2]) {
        session.handle_stack_event(
            stack,
            StackEvent::Write(WriteRequest::new(1, 10, HANDLES[3], &value, true)),
        );
    }

    fn subscribed() -> (Session, MockBleStack) {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        started(&mut session, &mut stack);
        connect(&mut session, &mut stack);
        write_cccd(&mut session, &mut stack, [0x01, 0x00]);
        stack.clear_calls();
        (session, stack)
    }

    #[test]
    fn test_start_issues_bring_up_requests() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();

        session.start(&mut stack).unwrap();
        assert_eq!(
            stack.calls().as_slice(),
            &[
                StackCall::RegisterApp(APP_ID),
                StackCall::SetDeviceName,
                StackCall::SetLocalMtu(500),
                StackCall::ConfigureAdvData(19),
            ]
        );
        assert_eq!(session.connection_state(), ConnectionState::AdvertisingIdle);
    }

    #[test]
    fn test_start_failure_is_returned() {
        let mut stack = MockBleStack::new();
        stack.set_next_adv_data_error(StackError::Rejected(0x01));
        let mut session = Session::new();

        assert_eq!(session.start(&mut stack), Err(StackError::Rejected(0x01)));
    }

    #[test]
    fn test_registration_creates_table() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        registered(&mut session, &mut stack);

        assert_eq!(session.table().state(), TableState::Requested);
        assert_eq!(
            stack.count(|c| *c == StackCall::CreateAttributeTable { interface: IFACE, entries: 4 }),
            1
        );
    }

    #[test]
    fn test_failed_registration_creates_nothing() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        session.handle_stack_event(
            &mut stack,
            StackEvent::Registered {
                status: Status::Failed(0x85),
                app_id: APP_ID,
                interface: IFACE,
            },
        );

        assert_eq!(session.table().state(), TableState::Unregistered);
        assert!(stack.calls().is_empty());
    }

    #[test]
    fn test_edge_triggered_sequence() {
        let (mut session, mut stack) = subscribed();

        for position in [0, 6, 11, 6, 0] {
            let outcome = session.on_zone_observed(&mut stack, zone_of(position));
            assert_eq!(outcome, Some(NotifyOutcome::Sent));
        }
        assert_eq!(stack.notified_bytes().as_slice(), &[0x02, 0x03, 0x01, 0x03, 0x02]);
    }

    #[test]
    fn test_constant_position_is_idempotent() {
        let (mut session, mut stack) = subscribed();

        assert_eq!(
            session.on_zone_observed(&mut stack, zone_of(3)),
            Some(NotifyOutcome::Sent)
        );
        for _ in 0..10 {
            assert_eq!(session.on_zone_observed(&mut stack, zone_of(3)), None);
        }
        assert_eq!(stack.notified_bytes().len(), 1);
    }

    #[test]
    fn test_no_attempt_before_service_started() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        registered(&mut session, &mut stack);

        assert_eq!(session.on_zone_observed(&mut stack, Zone::Green), None);
        assert_eq!(session.previous_zone(), None);
    }

    #[test]
    fn test_unsubscribed_change_is_consumed() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        started(&mut session, &mut stack);
        connect(&mut session, &mut stack);

        assert_eq!(
            session.on_zone_observed(&mut stack, Zone::Yellow),
            Some(NotifyOutcome::Refused(RefusalReason::NotSubscribed))
        );
        assert_eq!(session.previous_zone(), Some(Zone::Yellow));

        // Subscribing later does not replay the change
        write_cccd(&mut session, &mut stack, [0x01, 0x00]);
        assert_eq!(session.on_zone_observed(&mut stack, Zone::Yellow), None);
    }

    #[test]
    fn test_cccd_writes_toggle_subscription() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        started(&mut session, &mut stack);
        connect(&mut session, &mut stack);

        write_cccd(&mut session, &mut stack, [0x01, 0x00]);
        assert!(session.is_subscribed());

        write_cccd(&mut session, &mut stack, [0x02, 0x00]);
        assert!(session.is_subscribed());

        write_cccd(&mut session, &mut stack, [0x00, 0x00]);
        assert!(!session.is_subscribed());

        assert_eq!(
            stack.last_response(),
            Some(StackCall::Respond {
                conn_id: 1,
                trans_id: 10,
                status: GattStatus::Ok,
                value: None
            })
        );
    }

    #[test]
    fn test_write_without_response_request_is_silent() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        started(&mut session, &mut stack);
        connect(&mut session, &mut stack);
        stack.clear_calls();

        session.handle_stack_event(
            &mut stack,
            StackEvent::Write(WriteRequest::new(1, 11, HANDLES[3], &[0x01, 0x00], false)),
        );
        assert!(session.is_subscribed());
        assert!(stack.calls().is_empty());
    }

    #[test]
    fn test_oversized_write_rejected_without_change() {
        let (mut session, mut stack) = subscribed();

        session.handle_stack_event(
            &mut stack,
            StackEvent::Write(WriteRequest::new(1, 12, HANDLES[3], &[0x00; 21], true)),
        );
        assert!(session.is_subscribed());
        assert_eq!(
            stack.last_response(),
            Some(StackCall::Respond {
                conn_id: 1,
                trans_id: 12,
                status: GattStatus::InvalidAttrLen,
                value: None
            })
        );
    }

    #[test]
    fn test_read_returns_zero() {
        let (mut session, mut stack) = subscribed();
        session.on_zone_observed(&mut stack, Zone::Red);

        session.handle_stack_event(
            &mut stack,
            StackEvent::Read {
                conn_id: 1,
                trans_id: 20,
                handle: HANDLES[2],
            },
        );
        assert_eq!(
            stack.last_response(),
            Some(StackCall::Respond {
                conn_id: 1,
                trans_id: 20,
                status: GattStatus::Ok,
                value: Some(Vec::from_slice(&[0x00]).unwrap())
            })
        );
    }

    #[test]
    fn test_disconnect_resets_connection_state() {
        let (mut session, mut stack) = subscribed();

        session.handle_stack_event(
            &mut stack,
            StackEvent::Disconnected {
                conn_id: 1,
                remote: PEER,
                reason: 0x13,
            },
        );
        assert!(!session.is_subscribed());
        assert_eq!(session.connection_state(), ConnectionState::Advertising);
        assert_eq!(stack.advertising_starts(), 1);
    }

    #[test]
    fn test_previous_zone_survives_reconnect() {
        let (mut session, mut stack) = subscribed();
        session.on_zone_observed(&mut stack, Zone::Red);

        session.handle_stack_event(
            &mut stack,
            StackEvent::Disconnected {
                conn_id: 1,
                remote: PEER,
                reason: 0x13,
            },
        );
        connect(&mut session, &mut stack);
        write_cccd(&mut session, &mut stack, [0x01, 0x00]);

        // Still red: nothing new to announce
        assert_eq!(session.on_zone_observed(&mut stack, Zone::Red), None);
        assert_eq!(session.previous_zone(), Some(Zone::Red));
    }

    #[test]
    fn test_bad_table_never_notifies() {
        let mut stack = MockBleStack::new();
        let mut session = Session::new();
        registered(&mut session, &mut stack);
        session.handle_stack_event(
            &mut stack,
            StackEvent::TableCreated {
                status: Status::Success,
                num_handle: 3,
                handles: handles(&HANDLES[..3]),
            },
        );
        session.handle_stack_event(
            &mut stack,
            StackEvent::ServiceStarted {
                status: Status::Success,
                service_handle: HANDLES[0],
            },
        );
        connect(&mut session, &mut stack);
        write_cccd(&mut session, &mut stack, [0x01, 0x00]);

        for position in [0, 6, 11, -20] {
            assert_eq!(session.on_zone_observed(&mut stack, zone_of(position)), None);
        }
        assert!(stack.notified_bytes().is_empty());
    }

    #[test]
    fn test_informational_events_change_nothing() {
        let (mut session, mut stack) = subscribed();

        session.handle_stack_event(&mut stack, StackEvent::AdvStarted { status: Status::Success });
        session.handle_stack_event(&mut stack, StackEvent::AdvStopped { status: Status::Failed(1) });
        session.handle_stack_event(
            &mut stack,
            StackEvent::ConnParamsUpdated {
                status: Status::Success,
                interval: 0x10,
                latency: 0,
                timeout: 400,
            },
        );
        session.handle_stack_event(&mut stack, StackEvent::MtuExchanged { conn_id: 1, mtu: 247 });

        assert!(session.is_subscribed());
        assert!(stack.calls().is_empty());
    }
}
