//! Relay command vocabulary.
//!
//! The broker carries eight literal payloads.  They live in one ordered
//! table; [`parse_command`] walks it and the first exact byte match wins.
//! No prefix, suffix or case folding.

use core::fmt;

/// One of the four relay lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayId {
    Relay1,
    Relay2,
    Relay3,
    Relay4,
}

impl RelayId {
    /// All lines in board order.
    pub const ALL: [RelayId; 4] = [Self::Relay1, Self::Relay2, Self::Relay3, Self::Relay4];

    /// Zero-based slot in per-line arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Relay1 => 0,
            Self::Relay2 => 1,
            Self::Relay3 => 2,
            Self::Relay4 => 3,
        }
    }

    /// Human-facing line number (1–4).
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Relay1),
            2 => Some(Self::Relay2),
            3 => Some(Self::Relay3),
            4 => Some(Self::Relay4),
            _ => None,
        }
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RELAY{}", self.number())
    }
}

/// Coil state.  `On` drives the pin high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelayState {
    #[default]
    Off,
    On,
}

impl RelayState {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
        }
    }
}

/// A decoded relay instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelayCommand {
    pub relay: RelayId,
    pub state: RelayState,
}

impl RelayCommand {
    pub const fn new(relay: RelayId, state: RelayState) -> Self {
        Self { relay, state }
    }

    /// The literal payload that encodes this command.
    pub fn as_str(&self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, cmd)| cmd == self)
            .map_or("", |(text, _)| *text)
    }
}

impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.relay, self.state)
    }
}

/// Payload → command, in match priority order (all ON, then all OFF).
pub const COMMAND_TABLE: [(&str, RelayCommand); 8] = [
    ("RELAY1:ON", RelayCommand::new(RelayId::Relay1, RelayState::On)),
    ("RELAY2:ON", RelayCommand::new(RelayId::Relay2, RelayState::On)),
    ("RELAY3:ON", RelayCommand::new(RelayId::Relay3, RelayState::On)),
    ("RELAY4:ON", RelayCommand::new(RelayId::Relay4, RelayState::On)),
    ("RELAY1:OFF", RelayCommand::new(RelayId::Relay1, RelayState::Off)),
    ("RELAY2:OFF", RelayCommand::new(RelayId::Relay2, RelayState::Off)),
    ("RELAY3:OFF", RelayCommand::new(RelayId::Relay3, RelayState::Off)),
    ("RELAY4:OFF", RelayCommand::new(RelayId::Relay4, RelayState::Off)),
];

/// Look up `payload` in [`COMMAND_TABLE`].
pub fn parse_command(payload: &[u8]) -> Option<RelayCommand> {
    COMMAND_TABLE
        .iter()
        .find(|(text, _)| text.as_bytes() == payload)
        .map(|(_, cmd)| *cmd)
}
