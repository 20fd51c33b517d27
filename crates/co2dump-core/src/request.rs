//! Measurement requests to the sensors

use crate::channel::Channel;
use crate::frame::READ_CO2_REQUEST;
use crate::serial::{SerialPort, TransmitArm};

/// Which sensor links a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTarget {
    /// Every enabled sensor link, in configuration order
    Broadcast,
    Channel(Channel),
}

impl RequestTarget {
    /// Maps the wire convention (0 = all, n = channel n) onto a target.
    pub const fn from_number(number: u8) -> Option<Self> {
        if number == 0 {
            return Some(Self::Broadcast);
        }
        match Channel::new(number) {
            Some(channel) => Some(Self::Channel(channel)),
            None => None,
        }
    }
}

/// Queues a "read CO2" request on a sensor link and arms its transmitter.
///
/// Returns the number of request bytes that fit into the transmit ring.
pub fn request_from<A: TransmitArm, const N: usize>(port: &mut SerialPort<'_, A, N>) -> usize {
    let queued = port.queue(&READ_CO2_REQUEST);
    port.arm_transmit();
    queued
}
