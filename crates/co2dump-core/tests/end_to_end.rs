use std::cell::Cell;

use co2dump_core::frame::{Frame, READ_CO2_REQUEST, checksum};
use co2dump_core::{
    Channel, Clock, Co2Dumper, Config, LinkId, RoundPolicy, SerialIrq, SerialLink, TransmitArm,
    UartRegisters,
};

const INTERVAL_US: u32 = 10_000_000;

struct NoArm;

impl TransmitArm for NoArm {
    fn arm(&mut self) {}
}

struct TestClock<'c>(&'c Cell<u32>);

impl Clock for TestClock<'_> {
    fn now_micros(&self) -> u32 {
        self.0.get()
    }
}

/// Records whatever the interrupt handler shifts out
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

/// Runs the transmit-ready interrupt until the link goes quiet
fn transmitted(irq: &mut SerialIrq<'_>) -> Vec<u8> {
    let mut wire = Wire::default();
    if irq.is_transmit_armed() {
        while irq.on_transmit_ready(&mut wire) {}
    }
    wire.bytes
}

fn receive(irq: &mut SerialIrq<'_>, bytes: &[u8]) {
    for &byte in bytes {
        irq.on_byte_received(byte);
    }
}

fn response(co2: u16, raw_temperature: u8) -> Frame {
    let [high, low] = co2.to_be_bytes();
    let mut frame = [0xFF, 0x86, high, low, raw_temperature, 0, 0, 0, 0];
    frame[8] = checksum(&frame);
    frame
}

fn sensor(number: u8) -> LinkId {
    LinkId::Sensor(Channel::new(number).unwrap())
}

#[test]
fn single_sensor_frame_becomes_report_line() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1])
        .unwrap()
        .with_sensor_count(1);

    let mut control: SerialLink = SerialLink::new();
    let mut sensor1: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (sensor_port, mut sensor_irq) = sensor1.split(sensor(1), NoArm);

    let mut app = Co2Dumper::new(&config, control_port, [sensor_port], TestClock(&now)).unwrap();

    receive(&mut sensor_irq, &[0xFF, 0x86, 0x00, 0x34, 0x06, 0x00, 0x00, 0x00, 0x40]);
    assert_eq!(app.poll(), 1);

    assert_eq!(transmitted(&mut control_irq), b"52 -34\n");
}

#[test]
fn report_waits_for_every_sensor() {
    let now = Cell::new(0);
    let config = Config::default();

    let mut control: SerialLink = SerialLink::new();
    let mut links: [SerialLink; 3] = [SerialLink::new(), SerialLink::new(), SerialLink::new()];
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);

    let [l1, l2, l3] = &mut links;
    let (p1, mut irq1) = l1.split(sensor(1), NoArm);
    let (p2, mut irq2) = l2.split(sensor(2), NoArm);
    let (p3, mut irq3) = l3.split(sensor(3), NoArm);

    let mut app = Co2Dumper::new(&config, control_port, [p1, p2, p3], TestClock(&now)).unwrap();

    receive(&mut irq3, &response(1200, 30));
    receive(&mut irq1, &response(410, 69));
    app.poll();
    assert!(transmitted(&mut control_irq).is_empty());
    assert_eq!(app.aggregator().pending(), 1);

    receive(&mut irq2, &response(800, 60));
    app.poll();
    assert_eq!(transmitted(&mut control_irq), b"410 29 800 20 1200 -10\n");

    app.poll();
    assert!(transmitted(&mut control_irq).is_empty(), "one report per round");
}

#[test]
fn corrupted_frame_is_skipped_on_a_noisy_link() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1])
        .unwrap()
        .with_sensor_count(1);

    let mut control: SerialLink = SerialLink::new();
    let mut sensor1: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (sensor_port, mut sensor_irq) = sensor1.split(sensor(1), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [sensor_port], TestClock(&now)).unwrap();

    let mut corrupted = response(2000, 70);
    corrupted[8] = !corrupted[8];
    receive(&mut sensor_irq, &[0x00, 0x42]);
    receive(&mut sensor_irq, &corrupted);
    receive(&mut sensor_irq, &response(650, 62));

    assert_eq!(app.poll(), 1);
    assert_eq!(transmitted(&mut control_irq), b"650 22\n");
}

#[test]
fn frame_split_across_polls_is_reassembled() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1])
        .unwrap()
        .with_sensor_count(1);

    let mut control: SerialLink = SerialLink::new();
    let mut sensor1: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (sensor_port, mut sensor_irq) = sensor1.split(sensor(1), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [sensor_port], TestClock(&now)).unwrap();

    let frame = response(512, 40);
    receive(&mut sensor_irq, &frame[..4]);
    assert_eq!(app.poll(), 0);
    receive(&mut sensor_irq, &frame[4..]);
    assert_eq!(app.poll(), 1);

    assert_eq!(transmitted(&mut control_irq), b"512 0\n");
}

#[test]
fn requests_are_broadcast_once_per_interval() {
    let now = Cell::new(5);
    let config = Config::default()
        .with_sensor_channels(&[1, 2])
        .unwrap()
        .with_sensor_count(2)
        .with_poll_interval_us(INTERVAL_US);

    let mut control: SerialLink = SerialLink::new();
    let mut l1: SerialLink = SerialLink::new();
    let mut l2: SerialLink = SerialLink::new();
    let (control_port, _control_irq) = control.split(LinkId::Control, NoArm);
    let (p1, mut irq1) = l1.split(sensor(1), NoArm);
    let (p2, mut irq2) = l2.split(sensor(2), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [p1, p2], TestClock(&now)).unwrap();

    app.poll();
    assert!(transmitted(&mut irq1).is_empty(), "no request before the first interval");

    now.set(5 + INTERVAL_US + 1);
    app.poll();
    assert_eq!(transmitted(&mut irq1), READ_CO2_REQUEST);
    assert_eq!(transmitted(&mut irq2), READ_CO2_REQUEST);

    app.poll();
    assert!(transmitted(&mut irq1).is_empty());
    assert!(transmitted(&mut irq2).is_empty());
}

#[test]
fn duplicate_reading_completes_round_early_by_default() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1, 2])
        .unwrap()
        .with_sensor_count(2);

    let mut control: SerialLink = SerialLink::new();
    let mut l1: SerialLink = SerialLink::new();
    let mut l2: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (p1, mut irq1) = l1.split(sensor(1), NoArm);
    let (p2, _irq2) = l2.split(sensor(2), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [p1, p2], TestClock(&now)).unwrap();

    receive(&mut irq1, &response(400, 60));
    receive(&mut irq1, &response(401, 60));
    app.poll();

    assert_eq!(transmitted(&mut control_irq), b"401 20 0 0\n");
}

#[test]
fn distinct_channel_policy_waits_for_silent_sensor() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1, 2])
        .unwrap()
        .with_sensor_count(2)
        .with_round_policy(RoundPolicy::DistinctChannels);

    let mut control: SerialLink = SerialLink::new();
    let mut l1: SerialLink = SerialLink::new();
    let mut l2: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (p1, mut irq1) = l1.split(sensor(1), NoArm);
    let (p2, mut irq2) = l2.split(sensor(2), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [p1, p2], TestClock(&now)).unwrap();

    receive(&mut irq1, &response(400, 60));
    receive(&mut irq1, &response(401, 60));
    app.poll();
    assert!(transmitted(&mut control_irq).is_empty());

    receive(&mut irq2, &response(900, 35));
    app.poll();
    assert_eq!(transmitted(&mut control_irq), b"401 20 900 -5\n");
}

#[test]
fn host_input_on_control_link_is_ignored() {
    let now = Cell::new(0);
    let config = Config::default()
        .with_sensor_channels(&[1])
        .unwrap()
        .with_sensor_count(1);

    let mut control: SerialLink = SerialLink::new();
    let mut sensor1: SerialLink = SerialLink::new();
    let (control_port, mut control_irq) = control.split(LinkId::Control, NoArm);
    let (sensor_port, mut sensor_irq) = sensor1.split(sensor(1), NoArm);
    let mut app = Co2Dumper::new(&config, control_port, [sensor_port], TestClock(&now)).unwrap();

    // more than the ring holds over several polls; nothing may back up
    for _ in 0..4 {
        receive(&mut control_irq, &[b'x'; 300]);
        app.poll();
    }
    receive(&mut sensor_irq, &response(777, 41));
    app.poll();

    assert_eq!(transmitted(&mut control_irq), b"777 1\n");
}
