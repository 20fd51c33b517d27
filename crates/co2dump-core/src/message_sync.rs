//! Resynchronizing frame scanner
//!
//! The scanner keeps no state of its own; everything it needs is in the
//! receive ring. Each call consumes as many complete frames as are buffered:
//!
//! 1. fewer than 9 bytes buffered: stop and wait for more
//! 2. oldest byte is not the sync byte: drop it and retry
//! 3. the 9-byte window fails its checksum: drop one byte and retry
//! 4. otherwise consume the whole frame and dispatch the reading
//!
//! Dropping a single byte on failure means a corrupted or truncated frame is
//! walked past without any reset, and a valid frame that starts inside the
//! rejected window is still found.

use log::{debug, trace};

use crate::channel::Channel;
use crate::frame::{self, FRAME_LEN, Frame, Reading, SYNC_BYTE};
use crate::ring_buffer::Consumer;

/// Receives every reading the scanner decodes
pub trait ReadingSink {
    fn on_reading(&mut self, reading: Reading);
}

impl<F: FnMut(Reading)> ReadingSink for F {
    fn on_reading(&mut self, reading: Reading) {
        self(reading)
    }
}

/// Frame scanner for one sensor link
#[derive(Debug, Clone, Copy)]
pub struct MessageSync {
    channel: Channel,
}

impl MessageSync {
    pub const fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Decodes every complete frame in `rx`, handing each reading to `sink`.
    ///
    /// Returns the number of readings dispatched.
    pub fn drain<const N: usize, S: ReadingSink + ?Sized>(
        &self,
        rx: &mut Consumer<'_, N>,
        sink: &mut S,
    ) -> usize {
        let mut dispatched = 0;
        let mut window: Frame = [0; FRAME_LEN];

        while rx.peek_into(&mut window) {
            if window[0] != SYNC_BYTE {
                trace!("sensor{}: skipping {:#04x} while searching for sync", self.channel, window[0]);
                rx.discard(1);
                continue;
            }

            let measurement = match frame::decode(&window) {
                Ok(measurement) => measurement,
                Err(e) => {
                    debug!("sensor{}: {}, resynchronizing", self.channel, e);
                    rx.discard(1);
                    continue;
                }
            };

            rx.discard(FRAME_LEN);
            sink.on_reading(Reading {
                channel: self.channel,
                measurement,
            });
            dispatched += 1;
        }

        dispatched
    }
}
