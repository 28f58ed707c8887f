//! Four-channel relay bank.
//!
//! Owns one output line per relay and the last state driven onto it.
//! Lines must be configured before they are switched; a switch request
//! on an unconfigured line is refused and leaves the line untouched.
//!
//! Generic over the pin type so host tests can substitute recording pins.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::commands::{RelayId, RelayState};
use crate::app::ports::RelayError;
use crate::config::RelayConfig;

/// An output pin that needs one-time setup (reset, direction, initial low).
pub trait OutputLine: OutputPin {
    fn configure(&mut self) -> Result<(), Self::Error>;
}

struct Channel<P> {
    gpio: i32,
    pin: P,
    state: RelayState,
    configured: bool,
}

pub struct RelayBank<P> {
    channels: [Channel<P>; 4],
}

impl<P: OutputLine> RelayBank<P> {
    /// Build the bank from the configured pin map.  Nothing is touched
    /// until [`configure`](Self::configure) runs.
    pub fn from_config(config: &RelayConfig, mut make_pin: impl FnMut(i32) -> P) -> Self {
        let channels = config.gpios.map(|gpio| Channel {
            gpio,
            pin: make_pin(gpio),
            state: RelayState::Off,
            configured: false,
        });
        Self { channels }
    }

    pub fn gpio(&self, relay: RelayId) -> i32 {
        self.channels[relay.index()].gpio
    }

    pub fn is_configured(&self, relay: RelayId) -> bool {
        self.channels[relay.index()].configured
    }

    /// Configure every line in board order, stopping at the first failure.
    pub fn configure_all(&mut self) -> Result<(), RelayError> {
        for relay in RelayId::ALL {
            self.configure(relay)?;
        }
        info!("Relays: all {} lines configured low", RelayId::ALL.len());
        Ok(())
    }

    pub fn pin(&self, relay: RelayId) -> &P {
        &self.channels[relay.index()].pin
    }

    /// Reset the line and drive it low.
    pub fn configure(&mut self, relay: RelayId) -> Result<(), RelayError> {
        let ch = &mut self.channels[relay.index()];
        ch.pin.configure().map_err(|e| {
            warn!("{} GPIO{} configure failed: {:?}", relay, ch.gpio, e);
            RelayError::PinConfig { relay, gpio: ch.gpio }
        })?;
        ch.state = RelayState::Off;
        ch.configured = true;
        Ok(())
    }

    pub fn set_state(&mut self, relay: RelayId, state: RelayState) -> Result<(), RelayError> {
        let ch = &mut self.channels[relay.index()];
        if !ch.configured {
            return Err(RelayError::NotConfigured(relay));
        }
        let result = if state.is_on() { ch.pin.set_high() } else { ch.pin.set_low() };
        result.map_err(|e| {
            warn!("{} GPIO{} write failed: {:?}", relay, ch.gpio, e);
            RelayError::Write { relay, gpio: ch.gpio }
        })?;
        ch.state = state;
        Ok(())
    }

    pub fn state(&self, relay: RelayId) -> RelayState {
        self.channels[relay.index()].state
    }

    pub fn snapshot(&self) -> [RelayState; 4] {
        RelayId::ALL.map(|relay| self.state(relay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    #[derive(Debug, Clone, Copy)]
    struct PinFault;

    impl embedded_hal::digital::Error for PinFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    #[derive(Default)]
    struct FakePin {
        high: bool,
        writes: u32,
        fail_configure: bool,
        fail_write: bool,
    }

    impl ErrorType for FakePin {
        type Error = PinFault;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), PinFault> {
            if self.fail_write {
                return Err(PinFault);
            }
            self.writes += 1;
            self.high = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), PinFault> {
            if self.fail_write {
                return Err(PinFault);
            }
            self.writes += 1;
            self.high = true;
            Ok(())
        }
    }

    impl OutputLine for FakePin {
        fn configure(&mut self) -> Result<(), PinFault> {
            if self.fail_configure {
                return Err(PinFault);
            }
            self.high = false;
            Ok(())
        }
    }

    fn bank() -> RelayBank<FakePin> {
        RelayBank::from_config(&RelayConfig::default(), |_| FakePin::default())
    }

    #[test]
    fn pin_map_follows_config() {
        let b = bank();
        assert_eq!(b.gpio(RelayId::Relay1), 13);
        assert_eq!(b.gpio(RelayId::Relay2), 14);
        assert_eq!(b.gpio(RelayId::Relay3), 18);
        assert_eq!(b.gpio(RelayId::Relay4), 19);
    }

    #[test]
    fn switching_before_configure_is_refused() {
        let mut b = bank();
        assert_eq!(
            b.set_state(RelayId::Relay1, RelayState::On),
            Err(RelayError::NotConfigured(RelayId::Relay1))
        );
        assert_eq!(b.state(RelayId::Relay1), RelayState::Off);
        assert_eq!(b.pin(RelayId::Relay1).writes, 0);
    }

    #[test]
    fn configured_line_follows_commands() {
        let mut b = bank();
        b.configure_all().unwrap();
        b.set_state(RelayId::Relay3, RelayState::On).unwrap();
        assert!(b.pin(RelayId::Relay3).high);
        assert_eq!(
            b.snapshot(),
            [RelayState::Off, RelayState::Off, RelayState::On, RelayState::Off]
        );
        b.set_state(RelayId::Relay3, RelayState::Off).unwrap();
        assert!(!b.pin(RelayId::Relay3).high);
    }

    #[test]
    fn repeated_state_is_idempotent() {
        let mut b = bank();
        b.configure_all().unwrap();
        b.set_state(RelayId::Relay2, RelayState::On).unwrap();
        b.set_state(RelayId::Relay2, RelayState::On).unwrap();
        assert_eq!(b.state(RelayId::Relay2), RelayState::On);
        assert!(b.pin(RelayId::Relay2).high);
    }

    #[test]
    fn configure_failure_names_the_line() {
        let mut b = RelayBank::from_config(&RelayConfig::default(), |gpio| FakePin {
            fail_configure: gpio == 18,
            ..FakePin::default()
        });
        assert_eq!(
            b.configure_all(),
            Err(RelayError::PinConfig { relay: RelayId::Relay3, gpio: 18 })
        );
        assert!(b.is_configured(RelayId::Relay2));
        assert!(!b.is_configured(RelayId::Relay3));
    }

    #[test]
    fn write_failure_keeps_previous_state() {
        let mut b = RelayBank::from_config(&RelayConfig::default(), |gpio| FakePin {
            fail_write: gpio == 19,
            ..FakePin::default()
        });
        b.configure_all().unwrap();
        assert_eq!(
            b.set_state(RelayId::Relay4, RelayState::On),
            Err(RelayError::Write { relay: RelayId::Relay4, gpio: 19 })
        );
        assert_eq!(b.state(RelayId::Relay4), RelayState::Off);
    }
}
