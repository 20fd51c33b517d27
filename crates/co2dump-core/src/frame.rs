//! MH-Z19 frame codec
//!
//! Every message on a sensor link is 9 bytes long:
//!
//! | Offset | Request            | Response              |
//! |--------|--------------------|-----------------------|
//! | 0      | sync `0xFF`        | sync `0xFF`           |
//! | 1      | address `0x01`     | command `0x86`        |
//! | 2      | command `0x86`     | CO2 high byte         |
//! | 3      | 0                  | CO2 low byte          |
//! | 4      | 0                  | temperature + 40      |
//! | 5..=7  | 0                  | unused                |
//! | 8      | checksum           | checksum              |
//!
//! The checksum is the two's complement of the sum of bytes 1 to 7.

use thiserror_no_std::Error;

use crate::channel::Channel;

pub const FRAME_LEN: usize = 9;
pub const SYNC_BYTE: u8 = 0xFF;
pub const SENSOR_ADDRESS: u8 = 0x01;
pub const CMD_READ_CO2: u8 = 0x86;

// The sensor reports its internal temperature with a fixed +40 offset. The
// value is meant for its own compensation and is not a reliable room
// temperature; it is relayed as-is.
pub const TEMPERATURE_OFFSET: i16 = 40;

pub type Frame = [u8; FRAME_LEN];

/// "Read CO2 concentration" request: `FF 01 86 00 00 00 00 00 79`
pub const READ_CO2_REQUEST: Frame = request_frame(SENSOR_ADDRESS, CMD_READ_CO2);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Checksum { computed: u8, received: u8 },
}

/// Values decoded from one response frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurement {
    /// CO2 concentration in ppm
    pub co2: u16,
    /// Sensor temperature in °C
    pub temperature: i16,
}

/// A measurement tagged with the channel it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub channel: Channel,
    pub measurement: Measurement,
}

/// Two's complement of the sum of bytes 1..=7
pub const fn checksum(frame: &Frame) -> u8 {
    let mut sum = 0u8;
    let mut i = 1;
    while i < FRAME_LEN - 1 {
        sum = sum.wrapping_add(frame[i]);
        i += 1;
    }
    sum.wrapping_neg()
}

/// Builds a request with zeroed data bytes and a valid checksum.
pub const fn request_frame(address: u8, command: u8) -> Frame {
    let mut frame = [SYNC_BYTE, address, command, 0, 0, 0, 0, 0, 0];
    frame[FRAME_LEN - 1] = checksum(&frame);
    frame
}

/// Decodes a response window.
///
/// Only the checksum is verified here; locating the sync byte is the
/// scanner's job.
pub fn decode(window: &Frame) -> Result<Measurement, FrameError> {
    let computed = checksum(window);
    let received = window[FRAME_LEN - 1];
    if computed != received {
        return Err(FrameError::Checksum { computed, received });
    }

    Ok(Measurement {
        co2: u16::from_be_bytes([window[2], window[3]]),
        temperature: i16::from(window[4]) - TEMPERATURE_OFFSET,
    })
}
