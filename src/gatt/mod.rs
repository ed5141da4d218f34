//! GATT server state
//!
//! The attribute table for the encoder service and the per-connection
//! notification subscription.

pub mod subscription;
pub mod table;

pub use subscription::SubscriptionGate;
pub use table::{AttributeTable, ReadResponse, TableDefinition, TableState, WriteOutcome};
