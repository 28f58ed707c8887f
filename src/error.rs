//! Unified error type for the relay controller.
//!
//! Each adapter returns its own typed error; boot code funnels them into
//! [`Error`] so failures before the event loop are reported uniformly.

use core::fmt;

use crate::adapters::wifi::ConnectivityError;
use crate::app::ports::{BrokerError, ConfigError, RelayError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible boot step funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A relay line could not be configured.
    Relay(RelayError),
    /// The network link could not be brought up.
    Connectivity(ConnectivityError),
    /// The broker client could not be created or started.
    Broker(BrokerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Connectivity(e) => write!(f, "wifi: {e}"),
            Self::Broker(e) => write!(f, "mqtt: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Self::Broker(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
