//! Desktop simulator for the co2dump CO2 relay.
//!
//! Runs the real `co2dump-core` main loop against emulated MH-Z19 sensors.
//! Every link's interrupt side is driven by its own thread: sensor threads
//! answer "read CO2" requests with synthetic readings, and the control thread
//! prints the relay's report lines to stdout.
//!
//! # Usage
//!
//! ```text
//! co2dump-simulator [seconds]
//! ```
//!
//! The link layout is read from the same variables the firmware build uses:
//! `CO2DUMP_SENSOR_LINKS`, `CO2DUMP_SENSOR_COUNT` and
//! `CO2DUMP_POLL_INTERVAL_US`. Set `RUST_LOG=debug` to watch the frame
//! scanner at work.

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{error, info};

use co2dump_core::frame::{FRAME_LEN, Frame, READ_CO2_REQUEST, TEMPERATURE_OFFSET, checksum};
use co2dump_core::{
    Channel, Clock, Co2Dumper, Config, LinkId, SerialIrq, SerialLink, TransmitArm, UartRegisters,
};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Run time when none is given on the command line.
const DEFAULT_RUN_TIME: Duration = Duration::from_secs(30);

/// Request interval when `CO2DUMP_POLL_INTERVAL_US` is unset.
const DEFAULT_POLL_INTERVAL_US: &str = "2000000";

/// How long a simulated interrupt thread sleeps between checks.
const IRQ_TICK: Duration = Duration::from_millis(1);

/// Every n-th response from a sensor goes out with a broken checksum.
const CORRUPT_EVERY: u32 = 5;

// ---------------------------------------------------------------------------
// Host platform
// ---------------------------------------------------------------------------

/// Interrupt threads poll the armed flag, so arming needs no kick.
struct ThreadArm;

impl TransmitArm for ThreadArm {
    fn arm(&mut self) {}
}

struct HostClock {
    start: Instant,
}

impl Clock for HostClock {
    fn now_micros(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}

/// Collects whatever the link shifts out during one interrupt tick.
#[derive(Default)]
struct Wire {
    bytes: Vec<u8>,
}

impl UartRegisters for Wire {
    fn write_data(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn set_transmitter_enabled(&mut self, _enabled: bool) {}
}

fn drain_transmitter(irq: &mut SerialIrq<'_>) -> Vec<u8> {
    let mut wire = Wire::default();
    if irq.is_transmit_armed() {
        while irq.on_transmit_ready(&mut wire) {}
    }
    wire.bytes
}

// ---------------------------------------------------------------------------
// Emulated MH-Z19
// ---------------------------------------------------------------------------

/// Answers read requests with readings that drift over time.
struct MockSensor {
    channel: Channel,
    request: Vec<u8>,
    responses: u32,
    started: Instant,
}

impl MockSensor {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            request: Vec::with_capacity(FRAME_LEN),
            responses: 0,
            started: Instant::now(),
        }
    }

    /// Feeds bytes received from the relay. Returns the bytes to send back.
    fn on_bytes(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut reply = Vec::new();
        for &byte in bytes {
            if self.request.is_empty() && byte != READ_CO2_REQUEST[0] {
                continue;
            }
            self.request.push(byte);
            if self.request.len() < FRAME_LEN {
                continue;
            }
            if self.request == READ_CO2_REQUEST {
                reply.extend_from_slice(&self.respond());
            } else {
                log::warn!("sensor{}: unexpected request {:02X?}", self.channel, self.request);
            }
            self.request.clear();
        }
        reply
    }

    fn respond(&mut self) -> Vec<u8> {
        self.responses += 1;
        let t = self.started.elapsed().as_secs_f64();
        let phase = f64::from(self.channel.get());

        // CO2: 450-900 ppm, each channel out of phase with the others
        let co2 = (675.0 + 225.0 * (t / 40.0 + phase).sin()) as u16;
        // Temperature: 18-26 C
        let temperature = (22.0 + 4.0 * (t / 90.0 + phase).cos()) as i16;

        let [high, low] = co2.to_be_bytes();
        let raw_temperature = (temperature + TEMPERATURE_OFFSET) as u8;
        let mut frame: Frame = [0xFF, 0x86, high, low, raw_temperature, 0, 0, 0, 0];
        frame[8] = checksum(&frame);

        let mut bytes = Vec::with_capacity(FRAME_LEN + 2);
        if self.responses % CORRUPT_EVERY == 0 {
            // line noise ahead of a frame the relay has to reject
            let mut corrupted = frame;
            corrupted[8] ^= 0x5A;
            bytes.push(0x3C);
            bytes.extend_from_slice(&corrupted);
        }
        bytes.extend_from_slice(&frame);
        bytes
    }
}

fn run_sensor(mut irq: SerialIrq<'_>, stop: &AtomicBool) {
    let LinkId::Sensor(channel) = irq.id() else {
        return;
    };
    let mut sensor = MockSensor::new(channel);

    while !stop.load(Ordering::Relaxed) {
        let request = drain_transmitter(&mut irq);
        for byte in sensor.on_bytes(&request) {
            irq.on_byte_received(byte);
        }
        std::thread::sleep(IRQ_TICK);
    }
}

fn run_control(mut irq: SerialIrq<'_>, stop: &AtomicBool) {
    let stdout = std::io::stdout();
    while !stop.load(Ordering::Relaxed) {
        let output = drain_transmitter(&mut irq);
        if !output.is_empty() {
            let mut out = stdout.lock();
            let _ = out.write_all(&output);
            let _ = out.flush();
        }
        std::thread::sleep(IRQ_TICK);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn load_config() -> Result<Config, co2dump_core::ConfigError> {
    let links = std::env::var("CO2DUMP_SENSOR_LINKS").ok();
    let count = std::env::var("CO2DUMP_SENSOR_COUNT").ok();
    let interval = std::env::var("CO2DUMP_POLL_INTERVAL_US").ok();

    Config::from_overrides(
        links.as_deref(),
        count.as_deref(),
        Some(interval.as_deref().unwrap_or(DEFAULT_POLL_INTERVAL_US)),
    )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let run_time = match std::env::args().nth(1) {
        Some(arg) => match arg.parse() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                error!("run time must be a number of seconds, got {:?}", arg);
                std::process::exit(2);
            }
        },
        None => DEFAULT_RUN_TIME,
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {}", err);
            std::process::exit(2);
        }
    };

    let mut control_link: SerialLink = SerialLink::new();
    let mut sensor_links: Vec<SerialLink> =
        config.sensor_links.iter().map(|_| SerialLink::new()).collect();

    let (control, control_irq) = control_link.split(LinkId::Control, ThreadArm);
    let (sensor_ports, sensor_irqs): (Vec<_>, Vec<_>) = sensor_links
        .iter_mut()
        .zip(config.sensor_links.iter())
        .map(|(link, cfg)| link.split(LinkId::Sensor(cfg.channel), ThreadArm))
        .unzip();

    let clock = HostClock { start: Instant::now() };
    let mut app = match Co2Dumper::new(&config, control, sensor_ports, clock) {
        Ok(app) => app,
        Err(err) => {
            error!("failed to wire links: {}", err);
            std::process::exit(2);
        }
    };

    info!("Simulating for {} s", run_time.as_secs());
    let stop = AtomicBool::new(false);
    let deadline = Instant::now() + run_time;

    std::thread::scope(|scope| {
        scope.spawn(|| run_control(control_irq, &stop));
        for irq in sensor_irqs {
            let stop = &stop;
            scope.spawn(move || run_sensor(irq, stop));
        }

        while Instant::now() < deadline {
            app.poll();
            std::thread::sleep(IRQ_TICK);
        }
        stop.store(true, Ordering::Relaxed);
    });

    info!("Simulation finished");
}
