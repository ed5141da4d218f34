//! Zone detection
//!
//! Maps the encoder position onto three bands and detects when the band
//! changes. The wire value of each zone is fixed by the protocol and is not
//! ordered the same way as the zones themselves.

use crate::config::zones;

/// Discretized band of the encoder position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Green,
    Yellow,
    Red,
}

impl Zone {
    /// Byte sent in a notification for this zone
    ///
    /// | Zone   | Byte |
    /// |--------|------|
    /// | Red    | 0x01 |
    /// | Green  | 0x02 |
    /// | Yellow | 0x03 |
    pub fn notification_byte(self) -> u8 {
        match self {
            Zone::Red => 0x01,
            Zone::Green => 0x02,
            Zone::Yellow => 0x03,
        }
    }

    /// Decode a notification byte
    pub fn from_notification_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Zone::Red),
            0x02 => Some(Zone::Green),
            0x03 => Some(Zone::Yellow),
            _ => None,
        }
    }

    /// LED colour shown for this zone
    pub fn led_color(self) -> LedColor {
        match self {
            Zone::Green => LedColor::GREEN,
            Zone::Yellow => LedColor::YELLOW,
            Zone::Red => LedColor::RED,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Zone::Green => "GREEN",
            Zone::Yellow => "YELLOW",
            Zone::Red => "RED",
        }
    }
}

/// State of the three LED channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedColor {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl LedColor {
    pub const GREEN: Self = Self { red: false, green: true, blue: false };
    pub const YELLOW: Self = Self { red: true, green: true, blue: false };
    pub const RED: Self = Self { red: true, green: false, blue: false };
    pub const OFF: Self = Self { red: false, green: false, blue: false };
}

/// Position thresholds separating the zones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneThresholds {
    pub green_min: i32,
    pub green_max: i32,
    pub yellow_min: i32,
    pub yellow_max: i32,
}

impl ZoneThresholds {
    /// Thresholds from the build configuration
    pub const DEFAULT: Self = Self {
        green_min: zones::GREEN_ZONE_MIN,
        green_max: zones::GREEN_ZONE_MAX,
        yellow_min: zones::YELLOW_ZONE_MIN,
        yellow_max: zones::YELLOW_ZONE_MAX,
    };

    /// Classify a position. Total over all of `i32`.
    pub fn zone_of(&self, position: i32) -> Zone {
        if position >= self.green_min && position <= self.green_max {
            Zone::Green
        } else if (position > self.green_max && position <= self.yellow_max)
            || (position < self.green_min && position >= self.yellow_min)
        {
            Zone::Yellow
        } else {
            Zone::Red
        }
    }
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Classify a position with the configured thresholds
pub fn zone_of(position: i32) -> Zone {
    ZoneThresholds::DEFAULT.zone_of(position)
}

/// Edge detector over successive zone observations
///
/// The previous zone lives for the whole session and is deliberately kept
/// across reconnects.
#[derive(Debug, Default)]
pub struct ZoneTracker {
    previous: Option<Zone>,
}

impl ZoneTracker {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Record an observation.
    ///
    /// Returns the zone to announce when it differs from the last announced
    /// one and `armed` is set. The previous zone only advances when an
    /// announcement is made, so a change seen while disarmed is reported on
    /// the first armed observation.
    pub fn observe(&mut self, current: Zone, armed: bool) -> Option<Zone> {
        if Some(current) != self.previous && armed {
            self.previous = Some(current);
            Some(current)
        } else {
            None
        }
    }

    pub fn previous(&self) -> Option<Zone> {
        self.previous
    }
}
