//! Message dispatcher — the hexagonal core.
//!
//! [`Dispatcher`] consumes one [`ConnectionEvent`] at a time and turns it
//! into port calls.  It owns the link state and a few counters; the relay
//! lines themselves are owned by whatever implements [`RelayPort`].
//!
//! ```text
//!  ConnectionEvent ──▶ ┌──────────────────┐ ──▶ EventSink
//!                      │    Dispatcher    │
//!       BrokerPort  ◀──│ connect · match  │──▶ RelayPort
//!                      └──────────────────┘
//! ```
//!
//! Every outcome is terminal to its event: failures are reported through
//! the sink and dropped, never retried or escalated.

use log::{debug, info};

use crate::config::{BrokerConfig, QoS, TOPIC_CAP};

use super::commands::{RelayCommand, parse_command};
use super::events::{AckKind, AppEvent, ConnectionEvent};
use super::ports::{BrokerPort, EventSink, RelayPort};

/// Broker session as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

/// What a single event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A command matched and a relay was driven.
    Switched(RelayCommand),
    /// A command matched but the relay refused it.
    Failed(RelayCommand),
    /// A message arrived but matched no command.
    Unmatched,
    /// Lifecycle / ack / error event; reported only.
    Logged,
}

/// Running totals since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub connects: u32,
    /// Commands applied to a relay.
    pub matched: u32,
    pub rejected: u32,
    /// Commands matched but not applied.
    pub failed: u32,
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct Dispatcher {
    topic: heapless::String<TOPIC_CAP>,
    greeting: heapless::String<TOPIC_CAP>,
    qos: QoS,
    link: LinkState,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(broker: &BrokerConfig) -> Self {
        Self {
            topic: broker.topic.clone(),
            greeting: broker.greeting.clone(),
            qos: broker.qos,
            link: LinkState::Disconnected,
            stats: DispatchStats::default(),
        }
    }

    /// Process one broker notification.
    pub fn handle(
        &mut self,
        event: ConnectionEvent,
        relays: &mut impl RelayPort,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) -> Disposition {
        match event {
            ConnectionEvent::Connected => {
                self.on_connected(&*relays, broker, sink);
                Disposition::Logged
            }
            ConnectionEvent::Disconnected => {
                self.link = LinkState::Disconnected;
                sink.emit(&AppEvent::Disconnected);
                Disposition::Logged
            }
            ConnectionEvent::Subscribed { msg_id } => {
                Self::ack(AckKind::Subscribed, msg_id, sink)
            }
            ConnectionEvent::Unsubscribed { msg_id } => {
                Self::ack(AckKind::Unsubscribed, msg_id, sink)
            }
            ConnectionEvent::Published { msg_id } => {
                Self::ack(AckKind::Published, msg_id, sink)
            }
            ConnectionEvent::DataReceived(msg) => {
                sink.emit(&AppEvent::MessageReceived(msg.clone()));

                // Topic is deliberately not checked: only one topic is subscribed.
                let matched = if msg.truncated {
                    None
                } else {
                    parse_command(&msg.payload)
                };

                match matched {
                    Some(cmd) => match relays.set_state(cmd.relay, cmd.state) {
                        Ok(()) => {
                            self.stats.matched = self.stats.matched.wrapping_add(1);
                            sink.emit(&AppEvent::RelaySwitched(cmd));
                            Disposition::Switched(cmd)
                        }
                        Err(error) => {
                            self.stats.failed = self.stats.failed.wrapping_add(1);
                            sink.emit(&AppEvent::RelayFailed { command: cmd, error });
                            Disposition::Failed(cmd)
                        }
                    },
                    None => {
                        self.stats.rejected = self.stats.rejected.wrapping_add(1);
                        sink.emit(&AppEvent::CommandRejected(msg));
                        Disposition::Unmatched
                    }
                }
            }
            ConnectionEvent::Error(report) => {
                sink.emit(&AppEvent::BrokerFault(report));
                Disposition::Logged
            }
            ConnectionEvent::Other { event_id } => {
                sink.emit(&AppEvent::Unhandled { event_id });
                Disposition::Logged
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    // ── Internal ──────────────────────────────────────────────

    /// Greeting first, then subscription.  Each fires once per event;
    /// repeated connects repeat both.
    fn on_connected(
        &mut self,
        relays: &impl RelayPort,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) {
        self.link = LinkState::Connected;
        self.stats.connects = self.stats.connects.wrapping_add(1);
        sink.emit(&AppEvent::Connected);
        info!("Broker session #{} on topic '{}'", self.stats.connects, self.topic);

        match broker.publish(&self.topic, self.greeting.as_bytes(), self.qos) {
            Ok(msg_id) => sink.emit(&AppEvent::GreetingQueued { msg_id }),
            Err(e) => sink.emit(&AppEvent::GreetingFailed(e)),
        }

        match broker.subscribe(&self.topic, self.qos) {
            Ok(msg_id) => sink.emit(&AppEvent::SubscribeQueued { msg_id }),
            Err(e) => sink.emit(&AppEvent::SubscribeFailed(e)),
        }

        sink.emit(&AppEvent::RelayStatus(relays.snapshot()));
    }

    fn ack(kind: AckKind, msg_id: i32, sink: &mut impl EventSink) -> Disposition {
        debug!("{:?} ack for msg_id={}", kind, msg_id);
        sink.emit(&AppEvent::Acknowledged { kind, msg_id });
        Disposition::Logged
    }
}
