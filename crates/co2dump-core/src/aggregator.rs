//! Per-round reading aggregation
//!
//! The aggregator keeps the latest [`Measurement`] of every channel and counts
//! down the readings still missing from the current round. When the count
//! reaches zero the round is complete: the caller gets the full set of
//! readings to report, and the next round starts.
//!
//! Only one round is ever in flight.

use log::{debug, warn};

use crate::config::MAX_SENSOR_LINKS;
use crate::frame::{Measurement, Reading};

/// How readings are counted towards a round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundPolicy {
    /// Every accepted reading counts, whichever channel it came from.
    ///
    /// A channel that answers twice before another answers once completes the
    /// round early and the silent channel is reported with its previous
    /// value.
    #[default]
    CountDown,
    /// A round completes only once every channel has reported at least once.
    /// Repeated readings from a channel overwrite its value without counting.
    DistinctChannels,
}

pub struct SensorAggregator {
    readings: [Measurement; MAX_SENSOR_LINKS],
    seen: [bool; MAX_SENSOR_LINKS],
    sensor_count: usize,
    pending: usize,
    policy: RoundPolicy,
}

impl SensorAggregator {
    /// `sensor_count` is clamped to `1..=MAX_SENSOR_LINKS`.
    pub fn new(sensor_count: usize, policy: RoundPolicy) -> Self {
        let sensor_count = sensor_count.clamp(1, MAX_SENSOR_LINKS);
        Self {
            readings: [Measurement::default(); MAX_SENSOR_LINKS],
            seen: [false; MAX_SENSOR_LINKS],
            sensor_count,
            pending: sensor_count,
            policy,
        }
    }

    /// Records a reading.
    ///
    /// Returns the readings of all channels, in channel order, when this
    /// reading completes the round.
    pub fn on_reading_received(&mut self, reading: Reading) -> Option<&[Measurement]> {
        let index = reading.channel.index();
        if index >= self.sensor_count {
            warn!(
                "dropping reading from channel {} (sensor count is {})",
                reading.channel, self.sensor_count
            );
            return None;
        }

        self.readings[index] = reading.measurement;

        let counts = match self.policy {
            RoundPolicy::CountDown => true,
            RoundPolicy::DistinctChannels => !core::mem::replace(&mut self.seen[index], true),
        };
        if counts {
            self.pending -= 1;
        }

        if self.pending > 0 {
            return None;
        }

        debug!("round complete");
        self.pending = self.sensor_count;
        self.seen = [false; MAX_SENSOR_LINKS];
        Some(&self.readings[..self.sensor_count])
    }

    /// Readings still missing from the current round
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    /// Latest value of every channel, in channel order
    pub fn readings(&self) -> &[Measurement] {
        &self.readings[..self.sensor_count]
    }
}
