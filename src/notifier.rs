//! Zone notification delivery
//!
//! A notification is only attempted when the peer subscribed, is connected,
//! the service is running and the value handle is known. Anything short of
//! that is a soft refusal. Delivery is fire-and-forget: a transport failure
//! is reported once and never retried.

use crate::error::StackError;
use crate::gap::ConnectionManager;
use crate::gatt::{AttributeTable, SubscriptionGate};
use crate::stack::BleStack;
use crate::zone::Zone;

/// Why a notification was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    NotSubscribed,
    NotConnected,
    ServiceNotStarted,
    HandleUnset,
}

/// Result of a notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Handed to the stack
    Sent,
    /// Not eligible; not an error
    Refused(RefusalReason),
    /// The stack refused the send
    Failed(StackError),
}

pub struct Notifier;

impl Notifier {
    /// Check every precondition for sending, in order
    pub fn eligibility(
        table: &AttributeTable,
        connection: &ConnectionManager,
        gate: &SubscriptionGate,
    ) -> Result<(u8, u16, u16), RefusalReason> {
        if !gate.is_enabled() {
            return Err(RefusalReason::NotSubscribed);
        }
        let info = connection.connection().ok_or(RefusalReason::NotConnected)?;
        if !table.is_started() {
            return Err(RefusalReason::ServiceNotStarted);
        }
        let handle = table.value_handle().ok_or(RefusalReason::HandleUnset)?;

        Ok((info.interface, info.conn_id, handle))
    }

    /// Push the zone byte to the peer if eligible
    pub fn notify<S: BleStack>(
        stack: &mut S,
        table: &AttributeTable,
        connection: &ConnectionManager,
        gate: &SubscriptionGate,
        zone: Zone,
    ) -> NotifyOutcome {
        let (interface, conn_id, handle) = match Self::eligibility(table, connection, gate) {
            Ok(target) => target,
            Err(reason) => {
                log::debug!("notification refused: {:?}", reason);
                return NotifyOutcome::Refused(reason);
            }
        };

        let value = [zone.notification_byte()];
        match stack.send_notification(interface, conn_id, handle, &value) {
            Ok(()) => NotifyOutcome::Sent,
            Err(e) => {
                log::error!("send notification failed: {}", e);
                NotifyOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::traits::mock::{MockBleStack, StackCall};
    use crate::stack::Status;

    const PEER: [u8; 6] = [1, 2, 3, 4, 5, 6];

    struct Parts {
        stack: MockBleStack,
        table: AttributeTable,
        connection: ConnectionManager,
        gate: SubscriptionGate,
    }

    fn eligible(handles: [u16; 4]) -> Parts {
        let mut stack = MockBleStack::new();
        let mut table = AttributeTable::new();
        table.build_and_register(&mut stack, 3).unwrap();
        table.on_table_created(&mut stack, Status::Success, 4, &handles);
        table.on_service_started(Status::Success, handles[0]);

        let mut connection = ConnectionManager::new();
        connection.on_connected(&mut stack, 9, 3, PEER);

        let mut gate = SubscriptionGate::new();
        gate.set(true);

        stack.clear_calls();
        Parts {
            stack,
            table,
            connection,
            gate,
        }
    }

    fn notify(parts: &mut Parts, zone: Zone) -> NotifyOutcome {
        Notifier::notify(
            &mut parts.stack,
            &parts.table,
            &parts.connection,
            &parts.gate,
            zone,
        )
    }

    #[test]
    fn test_sends_zone_byte_on_value_handle() {
        let mut parts = eligible([40, 41, 42, 43]);

        assert_eq!(notify(&mut parts, Zone::Yellow), NotifyOutcome::Sent);
        let mut expected = heapless::Vec::new();
        expected.push(0x03).unwrap();
        assert_eq!(
            parts.stack.calls().as_slice(),
            &[StackCall::Notify {
                conn_id: 9,
                handle: 42,
                value: expected
            }]
        );
    }

    #[test]
    fn test_refused_when_not_subscribed() {
        let mut parts = eligible([40, 41, 42, 43]);
        parts.gate.set(false);

        assert_eq!(
            notify(&mut parts, Zone::Red),
            NotifyOutcome::Refused(RefusalReason::NotSubscribed)
        );
        assert!(parts.stack.calls().is_empty());
    }

    #[test]
    fn test_refused_when_disconnected() {
        let mut parts = eligible([40, 41, 42, 43]);
        parts.connection.on_disconnected(&mut parts.stack, PEER, 0x13);
        parts.stack.clear_calls();

        assert_eq!(
            notify(&mut parts, Zone::Red),
            NotifyOutcome::Refused(RefusalReason::NotConnected)
        );
        assert!(parts.stack.calls().is_empty());
    }

    #[test]
    fn test_refused_when_handle_unset() {
        let mut parts = eligible([40, 41, 0, 43]);

        assert_eq!(
            notify(&mut parts, Zone::Green),
            NotifyOutcome::Refused(RefusalReason::HandleUnset)
        );
    }

    #[test]
    fn test_refused_when_service_not_started() {
        let mut parts = eligible([40, 41, 42, 43]);
        parts.table = AttributeTable::new();

        assert_eq!(
            notify(&mut parts, Zone::Green),
            NotifyOutcome::Refused(RefusalReason::ServiceNotStarted)
        );
    }

    #[test]
    fn test_transport_failure_reported() {
        let mut parts = eligible([40, 41, 42, 43]);
        parts.stack.set_notify_error(Some(StackError::QueueFull));

        assert_eq!(
            notify(&mut parts, Zone::Green),
            NotifyOutcome::Failed(StackError::QueueFull)
        );
    }
}
