//! Hardware-independent core library for co2dump
//!
//! This crate contains all platform-agnostic logic of the CO2 relay firmware:
//! the interrupt-safe serial ring buffers, the MH-Z19 frame codec and
//! resynchronizing scanner, reading aggregation, the ASCII report encoder and
//! the cooperative polling loop that ties them together.
//!
//! It is `#![no_std]` so it compiles on the ESP32-S3 target as well as on
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod aggregator;
pub mod app;
pub mod channel;
pub mod config;
pub mod frame;
pub mod message_sync;
pub mod report;
pub mod request;
pub mod ring_buffer;
pub mod scheduler;
pub mod serial;

pub use aggregator::{RoundPolicy, SensorAggregator};
pub use app::Co2Dumper;
pub use channel::{Channel, LinkId};
pub use config::{Config, ConfigError};
pub use frame::{FrameError, Measurement, Reading};
pub use ring_buffer::{BUFFER_CAPACITY, RingBuffer};
pub use scheduler::{Clock, PollTimer};
pub use serial::{SerialIrq, SerialLink, SerialPort, TransmitArm, UartRegisters};
