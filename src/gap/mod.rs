//! GAP: advertising and the single peer connection

pub mod advertising;
pub mod connection;

pub use advertising::{AdvParams, ConnParamsRequest, ADV_RAW_DATA};
pub use connection::{ConnectionInfo, ConnectionManager, ConnectionState};
