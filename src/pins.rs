//! GPIO assignments for the four-channel relay board.
//!
//! Default pin map only.  The live mapping is carried by
//! [`RelayConfig`](crate::config::RelayConfig) so it can be overridden
//! from NVS; every driver reads the config, never these constants.

// ---------------------------------------------------------------------------
// Relay coil drivers (active HIGH)
// ---------------------------------------------------------------------------

pub const RELAY_1_GPIO: i32 = 13;
pub const RELAY_2_GPIO: i32 = 14;
pub const RELAY_3_GPIO: i32 = 18;
pub const RELAY_4_GPIO: i32 = 19;

/// Default line → GPIO map, indexed by relay number minus one.
pub const DEFAULT_RELAY_GPIOS: [i32; 4] = [RELAY_1_GPIO, RELAY_2_GPIO, RELAY_3_GPIO, RELAY_4_GPIO];

// ---------------------------------------------------------------------------
// Output-capable range (ESP32)
// ---------------------------------------------------------------------------

/// Highest GPIO with an output driver.  34–39 are input-only.
pub const MAX_OUTPUT_GPIO: i32 = 33;

/// GPIO 6–11 are wired to the SPI flash on WROOM/WROVER modules.
pub const FLASH_GPIO_RANGE: core::ops::RangeInclusive<i32> = 6..=11;

/// Whether `gpio` can safely drive a relay.
pub fn is_output_capable(gpio: i32) -> bool {
    (0..=MAX_OUTPUT_GPIO).contains(&gpio) && !FLASH_GPIO_RANGE.contains(&gpio)
}
