//! Rotary encoder
//!
//! The [`Encoder`] trait is what the event loop consumes. The quadrature
//! decoder is pure and host-testable; the edge-sampling driver needs the
//! embedded runtime.

pub mod quadrature;
pub mod traits;

#[cfg(feature = "embedded")]
pub mod driver;

pub use quadrature::QuadratureDecoder;
pub use traits::{Direction, Encoder, EncoderEvent, EncoderOptions, EncoderState};
