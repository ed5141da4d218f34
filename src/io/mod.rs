//! Button and status LED

pub mod gpio;
pub mod traits;

pub use gpio::{ActiveLowButton, RgbLed};
pub use traits::{Button, ButtonEdge, ButtonTracker, Led};
