//! Cooperative main loop
//!
//! [`Co2Dumper`] owns the main-loop side of every serial link together with
//! the aggregation state. Each [`Co2Dumper::poll`] does a bounded amount of
//! work and never blocks:
//!
//! 1. scan every sensor link for complete frames, feeding the aggregator,
//!    which queues a report on the control link whenever a round completes
//! 2. throw away whatever the host sent on the control link
//! 3. broadcast a new measurement request once the polling interval elapsed

use heapless::Vec;
use log::{debug, info, trace, warn};

use crate::aggregator::SensorAggregator;
use crate::channel::{Channel, LinkId};
use crate::config::{Config, ConfigError, MAX_SENSOR_LINKS};
use crate::frame::{FRAME_LEN, Reading};
use crate::message_sync::{MessageSync, ReadingSink};
use crate::report;
use crate::request::{self, RequestTarget};
use crate::ring_buffer::BUFFER_CAPACITY;
use crate::scheduler::{Clock, PollTimer};
use crate::serial::{SerialPort, TransmitArm};

struct SensorLink<'a, A, const N: usize> {
    port: SerialPort<'a, A, N>,
    sync: MessageSync,
}

/// Routes decoded readings into the aggregator and completed rounds onto the
/// control link
struct Dispatch<'r, 'a, A, const N: usize> {
    aggregator: &'r mut SensorAggregator,
    control: &'r mut SerialPort<'a, A, N>,
}

impl<A: TransmitArm, const N: usize> ReadingSink for Dispatch<'_, '_, A, N> {
    fn on_reading(&mut self, reading: Reading) {
        trace!(
            "sensor{}: {} ppm, {} C",
            reading.channel, reading.measurement.co2, reading.measurement.temperature
        );
        if let Some(readings) = self.aggregator.on_reading_received(reading) {
            report::emit(readings, self.control);
        }
    }
}

pub struct Co2Dumper<'a, A, C, const N: usize = BUFFER_CAPACITY> {
    control: SerialPort<'a, A, N>,
    sensors: Vec<SensorLink<'a, A, N>, MAX_SENSOR_LINKS>,
    aggregator: SensorAggregator,
    timer: PollTimer,
    clock: C,
}

impl<'a, A: TransmitArm, C: Clock, const N: usize> Co2Dumper<'a, A, C, N> {
    /// Wires the links together.
    ///
    /// Every sensor port must belong to a link enabled in `config`. The first
    /// broadcast request goes out one polling interval after this call.
    pub fn new<I>(
        config: &Config,
        control: SerialPort<'a, A, N>,
        sensor_ports: I,
        clock: C,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = SerialPort<'a, A, N>>,
    {
        config.validate()?;

        let mut sensors: Vec<SensorLink<'a, A, N>, MAX_SENSOR_LINKS> = Vec::new();
        for port in sensor_ports {
            let channel = match port.id() {
                LinkId::Sensor(channel) => channel,
                LinkId::Control => return Err(ConfigError::ControlLinkAsSensor),
            };
            if config.link(channel).is_none() {
                return Err(ConfigError::LinkNotEnabled(channel.get()));
            }
            if sensors.iter().any(|link| link.sync.channel() == channel) {
                return Err(ConfigError::DuplicateChannel(channel.get()));
            }
            sensors
                .push(SensorLink {
                    port,
                    sync: MessageSync::new(channel),
                })
                .map_err(|_| ConfigError::TooManyLinks)?;
        }

        for link in config.sensor_links.iter() {
            if !sensors.iter().any(|s| s.sync.channel() == link.channel) {
                warn!("sensor{} is enabled but has no port attached", link.channel);
            }
        }

        let timer = PollTimer::new(config.poll_interval_us, clock.now_micros());
        info!(
            "co2dump: {} sensor link(s), {} reading(s) per report, request every {} ms",
            sensors.len(),
            config.sensor_count,
            config.poll_interval_us / 1_000
        );

        Ok(Self {
            control,
            sensors,
            aggregator: SensorAggregator::new(config.sensor_count, config.round_policy),
            timer,
            clock,
        })
    }

    /// Runs one main-loop iteration.
    ///
    /// Returns the number of sensor readings decoded.
    pub fn poll(&mut self) -> usize {
        let mut decoded = 0;
        for link in self.sensors.iter_mut() {
            let mut dispatch = Dispatch {
                aggregator: &mut self.aggregator,
                control: &mut self.control,
            };
            decoded += link.sync.drain(link.port.rx(), &mut dispatch);
        }

        let ignored = self.control.rx().clear();
        if ignored > 0 {
            trace!("control: ignored {} byte(s) of host input", ignored);
        }

        if self.timer.poll(self.clock.now_micros()) {
            self.request(RequestTarget::Broadcast);
        }

        decoded
    }

    /// Polls forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.poll();
        }
    }

    /// Sends a "read CO2" request to one sensor or to all of them.
    pub fn request(&mut self, target: RequestTarget) {
        match target {
            RequestTarget::Broadcast => {
                debug!("requesting readings from {} sensor(s)", self.sensors.len());
                for link in self.sensors.iter_mut() {
                    Self::send_request(link);
                }
            }
            RequestTarget::Channel(channel) => {
                match self.sensors.iter_mut().find(|link| link.sync.channel() == channel) {
                    Some(link) => Self::send_request(link),
                    None => warn!("no sensor link on channel {}", channel),
                }
            }
        }
    }

    fn send_request(link: &mut SensorLink<'a, A, N>) {
        let queued = request::request_from(&mut link.port);
        if queued < FRAME_LEN {
            warn!(
                "sensor{}: transmit ring full, request truncated to {} byte(s)",
                link.sync.channel(),
                queued
            );
        }
    }

    pub fn aggregator(&self) -> &SensorAggregator {
        &self.aggregator
    }

    /// Channels with an attached sensor link, in polling order
    pub fn sensor_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.sensors.iter().map(|link| link.sync.channel())
    }
}
