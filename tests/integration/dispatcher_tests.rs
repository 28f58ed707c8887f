//! End-to-end dispatch: simulated broker client → handler → event router
//! → relay pins.

use std::sync::{Arc, Mutex};

use relayctl::adapters::hardware::HardwareAdapter;
use relayctl::adapters::mqtt::{MqttAdapter, MqttClient};
use relayctl::app::commands::{COMMAND_TABLE, RelayId, RelayState};
use relayctl::app::events::{AppEvent, ConnectionEvent, ErrorReport, InboundMessage};
use relayctl::app::ports::{BrokerError, RelayError};
use relayctl::app::service::{Dispatcher, Disposition, LinkState};
use relayctl::config::{BrokerConfig, QoS, RelayConfig, bounded};
use relayctl::events::EventRouter;

use crate::mock_hw::{MockPin, RecordingSink, mock_hardware};

type Handler = Box<dyn Fn(ConnectionEvent, &mut MqttClient)>;
type Router = EventRouter<HardwareAdapter<MockPin>, RecordingSink>;

/// Broker client wired to a router the way `main` wires it, plus a log of
/// what each delivery did.
struct Rig {
    router: Arc<Router>,
    outcomes: Arc<Mutex<Vec<Disposition>>>,
    mqtt: MqttAdapter<Handler>,
}

impl Rig {
    fn new() -> Self {
        Self::build(&BrokerConfig::default(), true)
    }

    fn build(broker: &BrokerConfig, configure: bool) -> Self {
        let mut hw = mock_hardware(&RelayConfig::default());
        if configure {
            hw.configure_all().unwrap();
        }
        let router = Arc::new(EventRouter::new(
            Dispatcher::new(broker),
            hw,
            RecordingSink::default(),
        ));
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let handler: Handler = {
            let router = Arc::clone(&router);
            let outcomes = Arc::clone(&outcomes);
            Box::new(move |event, client| {
                let out = router.deliver(event, client);
                outcomes.lock().unwrap().push(out);
            })
        };
        let mqtt = MqttAdapter::start(broker, "relayctl-efcafe", handler).unwrap();
        Self { router, outcomes, mqtt }
    }

    fn deliver(&mut self, event: ConnectionEvent) {
        self.mqtt.inject(event);
    }

    fn data(&mut self, payload: &[u8]) {
        self.deliver(ConnectionEvent::DataReceived(InboundMessage::new("data", payload)));
    }

    /// Dispositions since the last call.
    fn outcomes(&self) -> Vec<Disposition> {
        std::mem::take(&mut *self.outcomes.lock().unwrap())
    }

    fn client(&self) -> &MqttClient {
        self.mqtt.client()
    }

    fn levels(&self) -> [bool; 4] {
        self.router
            .inspect(|hw, _| RelayId::ALL.map(|r| hw.relays().pin(r).is_high()))
    }

    fn relays(&self) -> [RelayState; 4] {
        self.router.status().relays
    }

    fn events(&self) -> Vec<AppEvent> {
        self.router.inspect(|_, sink| sink.events.clone())
    }

    fn errors(&self) -> usize {
        self.router.inspect(|_, sink| sink.errors())
    }
}

#[test]
fn connect_greets_and_subscribes_on_data_topic() {
    let mut rig = Rig::new();

    rig.deliver(ConnectionEvent::Connected);

    assert_eq!(rig.router.status().link, LinkState::Connected);
    assert_eq!(rig.client().published.len(), 1);
    let (topic, payload, qos) = &rig.client().published[0];
    assert_eq!(topic, "data");
    assert_eq!(payload, b"Publish from ESP32_4RELAY");
    assert_eq!(*qos, QoS::AtLeastOnce);
    assert_eq!(rig.client().subscriptions, vec![("data".to_string(), QoS::AtLeastOnce)]);
    assert!(rig.events().contains(&AppEvent::RelayStatus([RelayState::Off; 4])));
}

#[test]
fn every_connect_repeats_greeting_and_subscription() {
    let mut rig = Rig::new();

    rig.deliver(ConnectionEvent::Connected);
    rig.deliver(ConnectionEvent::Disconnected);
    rig.deliver(ConnectionEvent::Connected);

    assert_eq!(rig.client().published.len(), 2);
    assert_eq!(rig.client().subscriptions.len(), 2);
    assert_eq!(rig.router.status().stats.connects, 2);
}

#[test]
fn relay2_on_touches_only_line_two() {
    let mut rig = Rig::new();

    rig.data(b"RELAY2:ON");

    assert!(matches!(rig.outcomes()[..], [Disposition::Switched(_)]));
    assert_eq!(rig.levels(), [false, true, false, false]);
    assert_eq!(rig.errors(), 0);
    rig.router.inspect(|hw, _| {
        for relay in [RelayId::Relay1, RelayId::Relay3, RelayId::Relay4] {
            assert_eq!(hw.relays().pin(relay).writes(), 0, "{relay} was written");
        }
    });
}

#[test]
fn garbage_changes_nothing_and_logs_one_error() {
    let mut rig = Rig::new();

    rig.data(b"RELAY3:ON");
    rig.outcomes();
    rig.data(b"garbage");

    assert_eq!(rig.outcomes(), vec![Disposition::Unmatched]);
    assert_eq!(rig.levels(), [false, false, true, false]);
    assert_eq!(rig.errors(), 1);
}

#[test]
fn full_command_table_round_trip() {
    let mut rig = Rig::new();

    for (text, _) in &COMMAND_TABLE[..4] {
        rig.data(text.as_bytes());
    }
    assert_eq!(rig.relays(), [RelayState::On; 4]);

    for (text, _) in &COMMAND_TABLE[4..] {
        rig.data(text.as_bytes());
    }
    assert_eq!(rig.relays(), [RelayState::Off; 4]);
    assert_eq!(rig.router.status().stats.matched, 8);
}

#[test]
fn repeating_a_command_is_idempotent() {
    let mut rig = Rig::new();

    rig.data(b"RELAY1:ON");
    rig.data(b"RELAY1:ON");

    assert_eq!(rig.relays()[0], RelayState::On);
    assert_eq!(rig.levels(), [true, false, false, false]);
}

#[test]
fn burst_deeper_than_any_buffer_ends_on_last_command() {
    let mut rig = Rig::new();

    for _ in 0..16 {
        rig.data(b"RELAY1:ON");
    }
    rig.data(b"RELAY1:OFF");

    assert_eq!(rig.outcomes().len(), 17);
    assert_eq!(rig.relays()[0], RelayState::Off);
    assert_eq!(rig.levels(), [false; 4]);
    assert_eq!(rig.router.status().stats.matched, 17);
}

#[test]
fn prefix_of_a_command_is_rejected() {
    let mut rig = Rig::new();

    rig.data(b"RELAY1:O");
    rig.data(b"");

    assert_eq!(rig.outcomes(), vec![Disposition::Unmatched, Disposition::Unmatched]);
    assert_eq!(rig.relays(), [RelayState::Off; 4]);
}

#[test]
fn fragmented_delivery_never_switches() {
    let mut rig = Rig::new();

    let msg = InboundMessage::new("data", b"RELAY1:ON").with_truncated(true);
    rig.deliver(ConnectionEvent::DataReceived(msg));

    assert_eq!(rig.relays()[0], RelayState::Off);
    assert_eq!(rig.errors(), 1);
}

#[test]
fn topic_is_not_checked() {
    let mut rig = Rig::new();

    rig.deliver(ConnectionEvent::DataReceived(InboundMessage::new("other/topic", b"RELAY4:ON")));

    assert_eq!(rig.relays()[3], RelayState::On);
}

#[test]
fn transport_error_keeps_link_state_and_relays() {
    let mut rig = Rig::new();

    rig.deliver(ConnectionEvent::Connected);
    rig.data(b"RELAY2:ON");
    rig.deliver(ConnectionEvent::Error(ErrorReport::transport(0x8006, 0, 104)));

    assert_eq!(rig.router.status().link, LinkState::Connected);
    assert_eq!(rig.relays()[1], RelayState::On);
    assert!(rig.events().iter().any(|e| matches!(e, AppEvent::BrokerFault(_))));
}

#[test]
fn outbox_full_on_connect_is_reported_once() {
    let mut rig = Rig::new();

    rig.mqtt.client_mut().fail_next(-2);
    rig.deliver(ConnectionEvent::Connected);

    assert!(rig.events().contains(&AppEvent::GreetingFailed(BrokerError::OutboxFull)));
    // Subscription still goes out after the greeting fails.
    assert_eq!(rig.client().subscriptions.len(), 1);
    assert!(rig.client().published.is_empty());
}

#[test]
fn custom_topic_and_qos_flow_through() {
    let broker = BrokerConfig {
        topic: bounded("lab/relays"),
        greeting: bounded("hello"),
        qos: QoS::ExactlyOnce,
        ..BrokerConfig::default()
    };
    let mut rig = Rig::build(&broker, true);

    rig.deliver(ConnectionEvent::Connected);

    assert_eq!(rig.client().published[0].0, "lab/relays");
    assert_eq!(rig.client().published[0].1, b"hello");
    assert_eq!(
        rig.client().subscriptions,
        vec![("lab/relays".to_string(), QoS::ExactlyOnce)]
    );
}

#[test]
fn unconfigured_lines_refuse_commands() {
    let mut rig = Rig::build(&BrokerConfig::default(), false);

    rig.data(b"RELAY1:ON");

    assert!(matches!(rig.outcomes()[..], [Disposition::Failed(_)]));
    assert_eq!(rig.relays()[0], RelayState::Off);
    assert_eq!(rig.router.inspect(|hw, _| hw.relays().pin(RelayId::Relay1).writes()), 0);

    let events = rig.events();
    assert!(!events.iter().any(|e| matches!(e, AppEvent::RelaySwitched(_))));
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::RelayFailed { error: RelayError::NotConfigured(RelayId::Relay1), .. }
    )));
    let stats = rig.router.status().stats;
    assert_eq!((stats.matched, stats.failed), (0, 1));
}
