//! ESP32-S3 firmware-specific modules for co2dump
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: UART setup and interrupt handlers, the microsecond clock
//! and the board's pin and channel assignment.

#![no_std]

pub mod board;
pub mod clock;
pub mod link;
