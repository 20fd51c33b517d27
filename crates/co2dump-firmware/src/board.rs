//! Pin and channel assignment of the relay board
//!
//! | Link     | UART  | TX     | RX     |
//! |----------|-------|--------|--------|
//! | control  | UART0 | GPIO43 | GPIO44 |
//! | sensor 1 | UART1 | GPIO17 | GPIO18 |
//! | sensor 2 | UART2 | GPIO15 | GPIO16 |
//!
//! The ESP32-S3 has three UARTs, so at most two sensor links fit next to the
//! control link.

use co2dump_core::{Channel, Config, ConfigError};
use esp_hal::handler;
use thiserror_no_std::Error;

use crate::link::{self, LinkSlot};

pub const SENSOR1_CHANNEL: Channel = channel(1);
pub const SENSOR2_CHANNEL: Channel = channel(2);

/// Sensor links wired on this board, used when the build sets none
pub const DEFAULT_SENSOR_LINKS: &str = "1,2";
pub const DEFAULT_SENSOR_COUNT: &str = "2";

pub static CONTROL: LinkSlot = link::empty_slot();
pub static SENSOR1: LinkSlot = link::empty_slot();
pub static SENSOR2: LinkSlot = link::empty_slot();

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("sensor channel {0} has no UART on this board")]
    NoUartForChannel(u8),
}

const fn channel(number: u8) -> Channel {
    match Channel::new(number) {
        Some(channel) => channel,
        None => panic!("sensor channel out of range"),
    }
}

/// Both sensor links, reported together
pub fn default_config() -> Config {
    let mut config = Config::default().with_sensor_count(2);
    config
        .sensor_links
        .retain(|link| link.channel == SENSOR1_CHANNEL || link.channel == SENSOR2_CHANNEL);
    config
}

/// Reads the configuration baked in by the build script.
pub fn load_config() -> Result<Config, BoardError> {
    let config = Config::from_overrides(
        option_env!("CO2DUMP_SENSOR_LINKS").or(Some(DEFAULT_SENSOR_LINKS)),
        option_env!("CO2DUMP_SENSOR_COUNT").or(Some(DEFAULT_SENSOR_COUNT)),
        option_env!("CO2DUMP_POLL_INTERVAL_US"),
    )?;

    if let Some(link) = config
        .sensor_links
        .iter()
        .find(|link| link.channel != SENSOR1_CHANNEL && link.channel != SENSOR2_CHANNEL)
    {
        return Err(BoardError::NoUartForChannel(link.channel.get()));
    }

    Ok(config)
}

#[handler]
pub fn control_isr() {
    link::service(&CONTROL);
}

#[handler]
pub fn sensor1_isr() {
    link::service(&SENSOR1);
}

#[handler]
pub fn sensor2_isr() {
    link::service(&SENSOR2);
}
