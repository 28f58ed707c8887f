//! Raw GPIO output lines for the relay coils.
//!
//! Each relay pin is reset, switched to output mode and driven low using
//! ESP-IDF sys calls.  [`GpioOutput`] implements the `embedded-hal`
//! output traits so the relay driver stays hardware-agnostic.
//!
//! On host builds the level is kept in memory.

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::drivers::relay::OutputLine;

// ── Error type ────────────────────────────────────────────────

/// A GPIO driver call returned a non-OK code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError {
    pub gpio: i32,
    pub rc: i32,
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GPIO{} driver call failed (rc={})", self.gpio, self.rc)
    }
}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ── GpioOutput ────────────────────────────────────────────────

/// One push-pull output pin, addressed by GPIO number.
#[derive(Debug)]
pub struct GpioOutput {
    gpio: i32,
    high: bool,
}

impl GpioOutput {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, high: false }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: writes an already-configured output pin; main-loop only.
            let rc = unsafe { gpio_set_level(self.gpio, u32::from(high)) };
            if rc != ESP_OK as i32 {
                return Err(GpioError { gpio: self.gpio, rc });
            }
        }
        self.high = high;
        Ok(())
    }
}

impl ErrorType for GpioOutput {
    type Error = GpioError;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl StatefulOutputPin for GpioOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

impl OutputLine for GpioOutput {
    #[cfg(target_os = "espidf")]
    fn configure(&mut self) -> Result<(), GpioError> {
        let gpio = self.gpio;
        let check = |rc: i32| {
            if rc == ESP_OK as i32 { Ok(()) } else { Err(GpioError { gpio, rc }) }
        };
        // SAFETY: single-threaded boot path; pin validated by config.
        unsafe {
            check(gpio_reset_pin(gpio))?;
            check(gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT))?;
            check(gpio_set_level(gpio, 0))?;
        }
        self.high = false;
        log::debug!("hw_init: GPIO{} configured as output (low)", gpio);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn configure(&mut self) -> Result<(), GpioError> {
        self.high = false;
        log::debug!("hw_init(sim): GPIO{} configured", self.gpio);
        Ok(())
    }
}
