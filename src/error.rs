//! Error types for the external collaborators
//!
//! All variants carry only fixed-size data so they can be copied through
//! channels and logged without `alloc`.

use core::fmt;

/// Errors reported by the BLE stack command interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The command queue towards the stack is full
    QueueFull,
    /// The stack refused the request with a raw error code
    Rejected(u16),
    /// The stack is not in a state that accepts the request
    NotReady,
    /// A request argument does not fit the stack's limits
    InvalidArgument,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::QueueFull => write!(f, "command queue full"),
            StackError::Rejected(code) => write!(f, "rejected by stack (0x{:x})", code),
            StackError::NotReady => write!(f, "stack not ready"),
            StackError::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

/// Errors reported by the rotary encoder driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderError {
    /// The driver has not been initialised
    NotInitialised,
    /// The driver state could not be accessed
    Unavailable,
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderError::NotInitialised => write!(f, "encoder not initialised"),
            EncoderError::Unavailable => write!(f, "encoder state unavailable"),
        }
    }
}

/// A GPIO read or write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError;

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio access failed")
    }
}

/// Bring-up failure; the firmware cannot continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    Stack(StackError),
    Encoder(EncoderError),
}

impl From<StackError> for StartError {
    fn from(e: StackError) -> Self {
        StartError::Stack(e)
    }
}

impl From<EncoderError> for StartError {
    fn from(e: EncoderError) -> Self {
        StartError::Encoder(e)
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::Stack(e) => write!(f, "BLE bring-up failed: {}", e),
            StartError::Encoder(e) => write!(f, "encoder bring-up failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use heapless::String;

    #[test]
    fn test_stack_error_display_includes_code() {
        let mut s: String<64> = String::new();
        write!(s, "{}", StackError::Rejected(0x103)).unwrap();
        assert_eq!(s.as_str(), "rejected by stack (0x103)");
    }

    #[test]
    fn test_start_error_wraps_source() {
        let err: StartError = EncoderError::NotInitialised.into();
        assert_eq!(err, StartError::Encoder(EncoderError::NotInitialised));

        let mut s: String<64> = String::new();
        write!(s, "{}", StartError::from(StackError::QueueFull)).unwrap();
        assert_eq!(s.as_str(), "BLE bring-up failed: command queue full");
    }
}
