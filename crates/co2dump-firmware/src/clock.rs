use co2dump_core::Clock;
use esp_hal::time::Instant;

/// Microseconds since boot from the system timer, truncated to 32 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_micros(&self) -> u32 {
        Instant::now().duration_since_epoch().as_micros() as u32
    }
}
