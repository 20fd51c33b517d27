//! Serial link and sensor channel identifiers

use core::fmt;

use crate::config::MAX_SENSOR_LINKS;

/// A sensor channel number, 1-based.
///
/// Channel `n` is wired to the `n`-th sensor UART and its readings land in
/// slot `n - 1` of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const FIRST: Channel = Channel(1);

    /// Returns `None` for 0 (broadcast) and for channels beyond the number of
    /// sensor links the firmware can drive.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= MAX_SENSOR_LINKS {
            Some(Self(number))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot index
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkId {
    /// Host-facing link that carries the ASCII reports
    Control,
    /// Link to the sensor on the given channel
    Sensor(Channel),
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => f.write_str("control"),
            Self::Sensor(channel) => write!(f, "sensor{channel}"),
        }
    }
}
