//! Port traits — the hexagonal boundary between the dispatcher and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher (domain)
//! ```
//!
//! Driven adapters (relay outputs, MQTT client, event sinks, storage)
//! implement these traits.  The [`Dispatcher`](super::service::Dispatcher)
//! consumes them via generics, so the domain core never touches hardware
//! or the network directly.

use core::fmt;

use crate::config::{QoS, SystemConfig};

use super::commands::{RelayId, RelayState};

/// Broker-assigned message identifier.
pub type MessageId = i32;

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port over the four relay lines.
pub trait RelayPort {
    /// Reset the line's pin, make it an output and drive it low.
    /// Must run once per line before [`set_state`](Self::set_state).
    fn configure(&mut self, relay: RelayId) -> Result<(), RelayError>;

    /// Drive the line.  Repeating the current state is a no-op in effect.
    /// On error the line keeps its previous state.
    fn set_state(&mut self, relay: RelayId, state: RelayState) -> Result<(), RelayError>;

    /// Last state driven onto the line.
    fn state(&self, relay: RelayId) -> RelayState;

    /// States of all four lines in board order.
    fn snapshot(&self) -> [RelayState; 4] {
        RelayId::ALL.map(|relay| self.state(relay))
    }
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain → MQTT client)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the MQTT client.  Both calls are fire-and-forget:
/// completion arrives later as a separate acknowledgement event.
pub trait BrokerPort {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, BrokerError>;

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, BrokerError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The dispatcher emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RelayPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// Pin reset/direction/level call failed during configuration.
    PinConfig { relay: RelayId, gpio: i32 },
    /// Switch requested before the line was configured.
    NotConfigured(RelayId),
    /// Level write failed.
    Write { relay: RelayId, gpio: i32 },
}

/// Errors from [`BrokerPort`] operations and client start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// A string could not be handed to the client (interior NUL, too long).
    InvalidArgument(&'static str),
    /// Client handle could not be created.
    InitFailed,
    /// Client refused to start or register the event handler (ESP error code).
    StartFailed(i32),
    /// Request rejected by the client (raw return code).
    Rejected(i32),
    /// Outbox is full; request dropped.
    OutboxFull,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinConfig { relay, gpio } => {
                write!(f, "{} pin GPIO{} configuration failed", relay, gpio)
            }
            Self::NotConfigured(relay) => write!(f, "{} not configured", relay),
            Self::Write { relay, gpio } => write!(f, "{} pin GPIO{} write failed", relay, gpio),
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid {}", what),
            Self::InitFailed => write!(f, "MQTT client init failed"),
            Self::StartFailed(rc) => write!(f, "MQTT client start failed (rc={})", rc),
            Self::Rejected(rc) => write!(f, "request rejected (rc={})", rc),
            Self::OutboxFull => write!(f, "outbox full"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
