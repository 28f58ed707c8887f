//! Hardware adapter — bridges the relay bank to the domain port trait.
//!
//! Owns the [`RelayBank`] and exposes it through [`RelayPort`].  This is
//! the only module in the system that drives the relay pins.  On
//! non-espidf targets the underlying GPIO lines use in-memory levels.

use crate::app::commands::{RelayId, RelayState};
use crate::app::ports::{RelayError, RelayPort};
use crate::config::RelayConfig;
use crate::drivers::hw_init::GpioOutput;
use crate::drivers::relay::{OutputLine, RelayBank};

/// Concrete adapter that puts the relay lines behind [`RelayPort`].
pub struct HardwareAdapter<P = GpioOutput> {
    relays: RelayBank<P>,
}

impl HardwareAdapter<GpioOutput> {
    /// Relay bank on raw ESP-IDF GPIO outputs.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(RelayBank::from_config(config, GpioOutput::new))
    }
}

impl<P: OutputLine> HardwareAdapter<P> {
    pub fn new(relays: RelayBank<P>) -> Self {
        Self { relays }
    }

    /// Configure all four lines, first failure aborts.
    pub fn configure_all(&mut self) -> Result<(), RelayError> {
        self.relays.configure_all()
    }

    pub fn relays(&self) -> &RelayBank<P> {
        &self.relays
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl<P: OutputLine> RelayPort for HardwareAdapter<P> {
    fn configure(&mut self, relay: RelayId) -> Result<(), RelayError> {
        self.relays.configure(relay)
    }

    fn set_state(&mut self, relay: RelayId, state: RelayState) -> Result<(), RelayError> {
        self.relays.set_state(relay, state)
    }

    fn state(&self, relay: RelayId) -> RelayState {
        self.relays.state(relay)
    }

    fn snapshot(&self) -> [RelayState; 4] {
        self.relays.snapshot()
    }
}
