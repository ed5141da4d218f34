//! Zone values as they appear on the wire.

#![allow(dead_code)]

use colored::{ColoredString, Colorize};

/// Zone reported by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Red,
    Green,
    Yellow,
}

impl Zone {
    /// Decode a notification payload. Anything but a single byte 1..=3 is rejected.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [0x01] => Some(Zone::Red),
            [0x02] => Some(Zone::Green),
            [0x03] => Some(Zone::Yellow),
            _ => None,
        }
    }

    pub fn label(self) -> ColoredString {
        match self {
            Zone::Red => "RED".red().bold(),
            Zone::Green => "GREEN".green().bold(),
            Zone::Yellow => "YELLOW".yellow().bold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_payloads() {
        assert_eq!(Zone::from_payload(&[1]), Some(Zone::Red));
        assert_eq!(Zone::from_payload(&[2]), Some(Zone::Green));
        assert_eq!(Zone::from_payload(&[3]), Some(Zone::Yellow));
    }

    #[test]
    fn test_invalid_payloads() {
        assert_eq!(Zone::from_payload(&[]), None);
        assert_eq!(Zone::from_payload(&[0]), None);
        assert_eq!(Zone::from_payload(&[4]), None);
        assert_eq!(Zone::from_payload(&[1, 1]), None);
    }
}
