//! Inbound broker notifications and outbound application events.
//!
//! [`ConnectionEvent`] is what the MQTT adapter hands to the
//! [`Dispatcher`](super::service::Dispatcher): an owned copy of one
//! client notification, safe to move off the client task.
//!
//! [`AppEvent`] is what the dispatcher emits through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters decide where
//! it goes (serial log, test recorder).

use crate::config::{TOPIC_CAP, bounded};

use super::commands::RelayCommand;
use super::commands::RelayState;
use super::ports::{BrokerError, MessageId, RelayError};

/// Inbound payload capacity.  Far larger than any command literal.
pub const PAYLOAD_CAP: usize = 64;

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// One received MQTT message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<TOPIC_CAP>,
    pub payload: heapless::Vec<u8, PAYLOAD_CAP>,
    /// The broker delivered more bytes than `payload` holds.
    pub truncated: bool,
}

impl InboundMessage {
    pub fn new(topic: &str, data: &[u8]) -> Self {
        let take = data.len().min(PAYLOAD_CAP);
        let mut payload = heapless::Vec::new();
        // Cannot fail: `take` never exceeds capacity.
        let _ = payload.extend_from_slice(&data[..take]);
        Self {
            topic: bounded(topic),
            payload,
            truncated: data.len() > PAYLOAD_CAP,
        }
    }

    /// Mark the message as partial (fragmented or oversized upstream).
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated |= truncated;
        self
    }

    /// Payload as text for logging; binary payloads render as a placeholder.
    pub fn payload_str(&self) -> &str {
        core::str::from_utf8(&self.payload).unwrap_or("<binary>")
    }
}

/// Broker error category, as reported by the MQTT client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// TCP/TLS transport failure.
    Transport,
    /// Broker refused the CONNECT (return code attached).
    ConnectionRefused(i32),
    /// Anything else, with the client's raw category.
    Other(i32),
}

/// Detail codes attached to a broker error notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    /// Last error reported from esp-tls.
    pub tls_last_esp_err: i32,
    /// Last error reported from the TLS stack.
    pub tls_stack_err: i32,
    /// Socket errno captured by the transport.
    pub sock_errno: i32,
}

impl ErrorReport {
    pub fn transport(tls_last_esp_err: i32, tls_stack_err: i32, sock_errno: i32) -> Self {
        Self {
            kind: ErrorKind::Transport,
            tls_last_esp_err,
            tls_stack_err,
            sock_errno,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

/// Connectivity / message notification from the MQTT client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Subscribed { msg_id: MessageId },
    Unsubscribed { msg_id: MessageId },
    Published { msg_id: MessageId },
    DataReceived(InboundMessage),
    Error(ErrorReport),
    /// Any client event the core has no handling for.
    Other { event_id: i32 },
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// Which broker acknowledgement arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    Subscribed,
    Unsubscribed,
    Published,
}

/// Structured events emitted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Broker session established.
    Connected,

    /// Broker session lost.
    Disconnected,

    /// Greeting handed to the client.
    GreetingQueued { msg_id: MessageId },

    /// Greeting could not be handed to the client.
    GreetingFailed(BrokerError),

    /// Subscription request handed to the client.
    SubscribeQueued { msg_id: MessageId },

    /// Subscription request could not be handed to the client.
    SubscribeFailed(BrokerError),

    /// Broker acknowledged an earlier request.
    Acknowledged { kind: AckKind, msg_id: MessageId },

    /// A message arrived (before command matching).
    MessageReceived(InboundMessage),

    /// A command matched and the relay was driven.
    RelaySwitched(RelayCommand),

    /// A command matched but the line could not be driven.
    RelayFailed { command: RelayCommand, error: RelayError },

    /// Payload matched no command; nothing changed.
    CommandRejected(InboundMessage),

    /// Broker reported an error (any category).
    BrokerFault(ErrorReport),

    /// Relay line states, reported after each connect.
    RelayStatus([RelayState; 4]),

    /// Client event id with no dedicated handling.
    Unhandled { event_id: i32 },
}

impl AppEvent {
    /// Whether this event is logged at error level.
    pub fn is_error(&self) -> bool {
        match self {
            Self::CommandRejected(_)
            | Self::RelayFailed { .. }
            | Self::GreetingFailed(_)
            | Self::SubscribeFailed(_) => true,
            Self::BrokerFault(report) => report.is_transport(),
            _ => false,
        }
    }
}
