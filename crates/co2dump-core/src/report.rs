//! ASCII report encoding for the control link
//!
//! One line per completed round: `<co2> <temperature>` pairs separated by
//! spaces, terminated by a newline, e.g. `412 -5 398 21\n`.

use core::fmt::{self, Write};

use crate::frame::Measurement;
use crate::serial::{SerialPort, TransmitArm};

/// Formats `readings` as one report line.
pub fn write_report<W: Write + ?Sized>(readings: &[Measurement], out: &mut W) -> fmt::Result {
    for (i, measurement) in readings.iter().enumerate() {
        let separator = if i + 1 == readings.len() { '\n' } else { ' ' };
        write!(out, "{} {}{}", measurement.co2, measurement.temperature, separator)?;
    }
    Ok(())
}

/// Queues a report on the control link and starts transmitting it.
pub fn emit<A: TransmitArm, const N: usize>(
    readings: &[Measurement],
    control: &mut SerialPort<'_, A, N>,
) {
    // Writing into the ring cannot fail; overflowing bytes are dropped.
    let _ = write_report(readings, control.tx());
    control.arm_transmit();
}
