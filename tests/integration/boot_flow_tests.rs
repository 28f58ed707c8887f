//! Boot sequence on the host: config load, network bring-up, first-boot
//! save, relay configuration, client id and broker start, in the order
//! `main` runs them.

use std::sync::Arc;

use relayctl::adapters::device_id;
use relayctl::adapters::mqtt::{MqttAdapter, MqttClient};
use relayctl::adapters::nvs::NvsAdapter;
use relayctl::adapters::wifi::{ConnectivityError, ConnectivityPort, WifiAdapter};
use relayctl::app::commands::{RelayId, RelayState};
use relayctl::app::events::{ConnectionEvent, InboundMessage};
use relayctl::app::ports::{ConfigError, ConfigPort, RelayError};
use relayctl::app::service::{Dispatcher, LinkState};
use relayctl::config::{SystemConfig, WifiConfig, bounded};
use relayctl::diagnostics::BootInfo;
use relayctl::error::Error;
use relayctl::events::EventRouter;

use crate::mock_hw::{MockConfigStore, MockPin, PinCall, RecordingSink, mock_hardware};

fn wifi_config() -> WifiConfig {
    WifiConfig {
        ssid: bounded("TestNet"),
        password: bounded("password1"),
    }
}

#[test]
fn host_boot_reaches_status_loop() {
    let info = BootInfo::collect();
    info.log();

    let nvs = NvsAdapter::new().unwrap();
    let mut config = nvs.load().unwrap();
    config.wifi = wifi_config();

    let mut wifi = WifiAdapter::from_config(&config.wifi).unwrap();
    wifi.connect().unwrap();
    assert!(wifi.is_connected());
    assert!(wifi.rssi().is_some());

    assert!(!nvs.is_provisioned());
    nvs.save(&config).unwrap();
    assert!(nvs.is_provisioned());
    assert_eq!(nvs.load().unwrap(), config);

    let mut hw = mock_hardware(&config.relays);
    hw.configure_all().unwrap();
    for relay in RelayId::ALL {
        assert_eq!(hw.relays().pin(relay).calls, vec![PinCall::Configure]);
    }
    let router = Arc::new(EventRouter::new(
        Dispatcher::new(&config.broker),
        hw,
        RecordingSink::default(),
    ));

    let client_id = device_id::client_id(&config.broker.client_id_prefix, &device_id::read_mac());
    assert_eq!(client_id.as_str(), "relayctl-efcafe");
    let handler = {
        let router = Arc::clone(&router);
        move |event: ConnectionEvent, client: &mut MqttClient| {
            router.deliver(event, client);
        }
    };
    let mut mqtt = MqttAdapter::start(&config.broker, &client_id, handler).unwrap();

    mqtt.inject(ConnectionEvent::Connected);
    mqtt.inject(ConnectionEvent::DataReceived(InboundMessage::new("data", b"RELAY3:ON")));

    assert_eq!(mqtt.client().published.len(), 1);
    let status = router.status();
    assert_eq!(status.link, LinkState::Connected);
    assert_eq!(status.relays[2], RelayState::On);
    assert_eq!((status.stats.matched, status.stats.failed), (1, 0));
}

#[test]
fn stored_pin_map_drives_the_bank() {
    let nvs = NvsAdapter::new().unwrap();
    let mut cfg = SystemConfig::default();
    cfg.relays.gpios = [21, 22, 23, 25];
    nvs.save(&cfg).unwrap();

    let loaded = nvs.load().unwrap();
    let hw = mock_hardware(&loaded.relays);
    assert_eq!(hw.relays().gpio(RelayId::Relay1), 21);
    assert_eq!(hw.relays().gpio(RelayId::Relay4), 25);
}

#[test]
fn config_load_failure_falls_back_to_defaults() {
    let store = MockConfigStore {
        fail_load: Some(ConfigError::Corrupted),
        ..MockConfigStore::default()
    };
    let config = store.load().unwrap_or_default();
    assert_eq!(config, SystemConfig::default());
}

#[test]
fn wifi_failure_is_fatal_with_context() {
    let mut wifi = WifiAdapter::from_config(&wifi_config()).unwrap();
    wifi.sim_fail_next_connect();

    let result: anyhow::Result<()> = wifi
        .connect()
        .map_err(Error::from)
        .map_err(|e| anyhow::Error::from(e).context("WiFi bring-up"));
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "WiFi bring-up");
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::Connectivity(ConnectivityError::ConnectionFailed))
    );
}

#[test]
fn missing_credentials_stop_boot() {
    let cfg = WifiConfig {
        ssid: bounded(""),
        password: bounded(""),
    };
    assert_eq!(
        WifiAdapter::from_config(&cfg).err(),
        Some(ConnectivityError::InvalidSsid)
    );
}

#[test]
fn relay_configure_failure_names_the_pin() {
    let cfg = SystemConfig::default();
    let mut hw = relayctl::adapters::hardware::HardwareAdapter::new(
        relayctl::drivers::relay::RelayBank::from_config(&cfg.relays, |gpio| MockPin {
            fail_configure: gpio == 19,
            ..MockPin::new(gpio)
        }),
    );
    let err = Error::from(hw.configure_all().unwrap_err());
    assert_eq!(
        err,
        Error::Relay(RelayError::PinConfig { relay: RelayId::Relay4, gpio: 19 })
    );
}
