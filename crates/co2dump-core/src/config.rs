//! Build-time configuration
//!
//! Nothing here is persisted: the firmware derives its [`Config`] from
//! environment values baked in at build time and validates it once at boot.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::aggregator::RoundPolicy;
use crate::channel::Channel;

/// Number of sensor UARTs the firmware can drive besides the control link
pub const MAX_SENSOR_LINKS: usize = 3;

/// Interval between broadcast requests (10 s)
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10_000_000;

pub const DEFAULT_SENSOR_COUNT: usize = 3;

/// Baud rate of the host-facing control link
pub const CONTROL_BAUD_RATE: u32 = 19_200;

/// MH-Z19 sensors only speak 9600 8N1
pub const SENSOR_BAUD_RATE: u32 = 9_600;

/// One enabled sensor link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub channel: Channel,
    pub baud_rate: u32,
}

impl LinkConfig {
    pub const fn new(channel: Channel) -> Self {
        Self {
            channel,
            baud_rate: SENSOR_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub control_baud_rate: u32,
    /// Enabled sensor links, in polling order
    pub sensor_links: Vec<LinkConfig, MAX_SENSOR_LINKS>,
    /// Readings per report; a round completes after this many readings
    pub sensor_count: usize,
    pub poll_interval_us: u32,
    pub round_policy: RoundPolicy,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sensor channel {0} is not in 1..=3")]
    InvalidChannel(u8),
    #[error("sensor channel {0} is enabled twice")]
    DuplicateChannel(u8),
    #[error("more than 3 sensor links enabled")]
    TooManyLinks,
    #[error("sensor count {0} is not in 1..=3")]
    InvalidSensorCount(usize),
    #[error("sensor channel {channel} is beyond the sensor count {sensor_count}")]
    ChannelNotReported { channel: u8, sensor_count: usize },
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
    #[error("{key} is not a valid number")]
    InvalidNumber { key: &'static str },
    #[error("link {0} is not enabled in the configuration")]
    LinkNotEnabled(u8),
    #[error("the control link cannot serve as a sensor link")]
    ControlLinkAsSensor,
}

impl Default for Config {
    fn default() -> Self {
        let sensor_links = (1..=MAX_SENSOR_LINKS as u8)
            .filter_map(Channel::new)
            .map(LinkConfig::new)
            .collect();

        Self {
            control_baud_rate: CONTROL_BAUD_RATE,
            sensor_links,
            sensor_count: DEFAULT_SENSOR_COUNT,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            round_policy: RoundPolicy::default(),
        }
    }
}

impl Config {
    /// Replaces the enabled sensor links. Channel numbers are 1-based.
    pub fn with_sensor_channels(mut self, channels: &[u8]) -> Result<Self, ConfigError> {
        self.sensor_links.clear();
        for &number in channels {
            let channel = Channel::new(number).ok_or(ConfigError::InvalidChannel(number))?;
            if self.link(channel).is_some() {
                return Err(ConfigError::DuplicateChannel(number));
            }
            self.sensor_links
                .push(LinkConfig::new(channel))
                .map_err(|_| ConfigError::TooManyLinks)?;
        }
        Ok(self)
    }

    pub fn with_sensor_count(mut self, sensor_count: usize) -> Self {
        self.sensor_count = sensor_count;
        self
    }

    pub fn with_poll_interval_us(mut self, poll_interval_us: u32) -> Self {
        self.poll_interval_us = poll_interval_us;
        self
    }

    pub fn with_round_policy(mut self, round_policy: RoundPolicy) -> Self {
        self.round_policy = round_policy;
        self
    }

    /// Builds a configuration from optional textual overrides, as baked in
    /// by the firmware's build script.
    ///
    /// `sensor_links` is a comma-separated channel list (`"1,2"`); an empty
    /// string disables every sensor link.
    pub fn from_overrides(
        sensor_links: Option<&str>,
        sensor_count: Option<&str>,
        poll_interval_us: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(list) = sensor_links {
            let mut channels: Vec<u8, MAX_SENSOR_LINKS> = Vec::new();
            for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                let number = item.parse().map_err(|_| ConfigError::InvalidNumber {
                    key: "CO2DUMP_SENSOR_LINKS",
                })?;
                channels.push(number).map_err(|_| ConfigError::TooManyLinks)?;
            }
            config = config.with_sensor_channels(&channels)?;
        }

        if let Some(count) = sensor_count {
            let count = count.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: "CO2DUMP_SENSOR_COUNT",
            })?;
            config = config.with_sensor_count(count);
        }

        if let Some(interval) = poll_interval_us {
            let interval = interval.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: "CO2DUMP_POLL_INTERVAL_US",
            })?;
            config = config.with_poll_interval_us(interval);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SENSOR_LINKS).contains(&self.sensor_count) {
            return Err(ConfigError::InvalidSensorCount(self.sensor_count));
        }
        if self.poll_interval_us == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        for (i, link) in self.sensor_links.iter().enumerate() {
            if self.sensor_links[..i].iter().any(|other| other.channel == link.channel) {
                return Err(ConfigError::DuplicateChannel(link.channel.get()));
            }
            if link.channel.get() as usize > self.sensor_count {
                return Err(ConfigError::ChannelNotReported {
                    channel: link.channel.get(),
                    sensor_count: self.sensor_count,
                });
            }
        }

        Ok(())
    }

    /// Looks up an enabled sensor link
    pub fn link(&self, channel: Channel) -> Option<&LinkConfig> {
        self.sensor_links.iter().find(|link| link.channel == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sensor_links.len(), 3);
        assert_eq!(config.sensor_count, 3);
        assert_eq!(config.poll_interval_us, 10_000_000);
        assert_eq!(config.round_policy, RoundPolicy::CountDown);
    }

    #[test]
    fn test_sensor_channels_reject_invalid_and_duplicates() {
        assert_eq!(
            Config::default().with_sensor_channels(&[0]),
            Err(ConfigError::InvalidChannel(0))
        );
        assert_eq!(
            Config::default().with_sensor_channels(&[4]),
            Err(ConfigError::InvalidChannel(4))
        );
        assert_eq!(
            Config::default().with_sensor_channels(&[1, 1]),
            Err(ConfigError::DuplicateChannel(1))
        );
    }

    #[test]
    fn test_channel_beyond_sensor_count_is_rejected() {
        let config = Config::default().with_sensor_count(1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ChannelNotReported {
                channel: 2,
                sensor_count: 1
            })
        );
    }

    #[test]
    fn test_sensor_count_bounds() {
        let config = Config::default().with_sensor_channels(&[]).unwrap();
        assert_eq!(
            config.clone().with_sensor_count(0).validate(),
            Err(ConfigError::InvalidSensorCount(0))
        );
        assert_eq!(
            config.with_sensor_count(4).validate(),
            Err(ConfigError::InvalidSensorCount(4))
        );
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let config = Config::default().with_poll_interval_us(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_overrides(Some("1, 2"), Some("2"), Some("5000000")).unwrap();

        let channels: Vec<u8, 3> = config.sensor_links.iter().map(|l| l.channel.get()).collect();
        assert_eq!(&channels[..], &[1, 2]);
        assert_eq!(config.sensor_count, 2);
        assert_eq!(config.poll_interval_us, 5_000_000);
    }

    #[test]
    fn test_empty_link_list_disables_sensors() {
        let config = Config::from_overrides(Some(""), None, None).unwrap();
        assert!(config.sensor_links.is_empty());
    }

    #[test]
    fn test_missing_overrides_keep_defaults() {
        assert_eq!(Config::from_overrides(None, None, None), Ok(Config::default()));
    }

    #[test]
    fn test_malformed_override_names_the_key() {
        assert_eq!(
            Config::from_overrides(None, None, Some("ten seconds")),
            Err(ConfigError::InvalidNumber {
                key: "CO2DUMP_POLL_INTERVAL_US"
            })
        );
    }
}
