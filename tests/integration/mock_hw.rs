//! Mock hardware and sinks for integration tests.
//!
//! [`MockPin`] records every level written so tests can assert on the
//! full pin history without touching GPIO registers.

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use relayctl::adapters::hardware::HardwareAdapter;
use relayctl::app::events::AppEvent;
use relayctl::app::ports::{ConfigError, ConfigPort, EventSink};
use relayctl::config::{RelayConfig, SystemConfig};
use relayctl::drivers::relay::{OutputLine, RelayBank};

// ── Pin ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCall {
    Configure,
    High,
    Low,
}

pub struct MockPin {
    pub gpio: i32,
    pub calls: Vec<PinCall>,
    pub fail_configure: bool,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            calls: Vec::new(),
            fail_configure: false,
        }
    }

    /// Level after the last write (configure drives low).
    pub fn is_high(&self) -> bool {
        matches!(self.calls.last(), Some(PinCall::High))
    }

    pub fn writes(&self) -> usize {
        self.calls.iter().filter(|c| **c != PinCall::Configure).count()
    }
}

impl ErrorType for MockPin {
    type Error = PinFault;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        self.calls.push(PinCall::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        self.calls.push(PinCall::High);
        Ok(())
    }
}

impl OutputLine for MockPin {
    fn configure(&mut self) -> Result<(), PinFault> {
        if self.fail_configure {
            return Err(PinFault);
        }
        self.calls.push(PinCall::Configure);
        Ok(())
    }
}

/// Hardware adapter over mock pins using the given pin map.
pub fn mock_hardware(config: &RelayConfig) -> HardwareAdapter<MockPin> {
    HardwareAdapter::new(RelayBank::from_config(config, MockPin::new))
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn errors(&self) -> usize {
        self.events.iter().filter(|e| e.is_error()).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config store ──────────────────────────────────────────────

/// In-memory config store that never validates; for fault injection.
#[derive(Default)]
pub struct MockConfigStore {
    pub stored: std::cell::RefCell<Option<SystemConfig>>,
    pub fail_load: Option<ConfigError>,
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        if let Some(e) = self.fail_load {
            return Err(e);
        }
        Ok(self.stored.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        *self.stored.borrow_mut() = Some(config.clone());
        Ok(())
    }
}
