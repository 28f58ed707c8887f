//! relayctl firmware — Main Entry Point
//!
//! Four relays driven by text commands over MQTT.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   MqttAdapter     │
//! │  (RelayPort)       (EventSink)    (ConfigPort) (BrokerPort)    │
//! │  WifiAdapter                                                   │
//! │  (Connectivity)                                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Dispatcher (pure logic)                   │    │
//! │  │  connect → greet + subscribe · payload → relay         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EventRouter: esp-mqtt task dispatches under one mutex         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use relayctl::adapters::device_id;
use relayctl::adapters::hardware::HardwareAdapter;
use relayctl::adapters::log_sink::LogEventSink;
use relayctl::adapters::mqtt::{MqttAdapter, MqttClient};
use relayctl::adapters::nvs::NvsAdapter;
use relayctl::adapters::wifi::{ConnectivityPort, WifiAdapter};
use relayctl::app::events::ConnectionEvent;
use relayctl::app::ports::ConfigPort;
use relayctl::app::service::Dispatcher;
use relayctl::config::SystemConfig;
use relayctl::diagnostics::{self, BootInfo};
use relayctl::error::Error;
use relayctl::events::EventRouter;

/// Interval between status lines on the console.
const STATUS_PERIOD: Duration = Duration::from_secs(60);

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    diagnostics::install_panic_handler();

    info!("╔══════════════════════════════════════╗");
    info!("║  relayctl v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    BootInfo::collect().log();
    diagnostics::apply_log_levels();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(Error::from).context("NVS flash init")?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Network services ───────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut wifi = WifiAdapter::from_config(&config.wifi).map_err(Error::from)?;
    wifi.attach_driver(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?,
        sysloop,
    )?);
    // No retry here: without a link there is nothing to control.
    wifi.connect().map_err(Error::from).context("WiFi bring-up")?;

    // First boot: keep the settings that just reached the network.
    if !nvs.is_provisioned() {
        if let Err(e) = nvs.save(&config) {
            warn!("NVS config save failed ({}), will retry next boot", e);
        }
    }

    // ── 4. Relay lines ────────────────────────────────────────
    let mut hw = HardwareAdapter::from_config(&config.relays);
    hw.configure_all().map_err(Error::from).context("relay GPIO setup")?;
    let dispatcher = Dispatcher::new(&config.broker);
    info!(
        "Relays ready on GPIO {:?}, listening on '{}'",
        config.relays.gpios,
        dispatcher.topic()
    );
    let router = Arc::new(EventRouter::new(dispatcher, hw, LogEventSink::new()));

    // ── 5. Broker client ──────────────────────────────────────
    let mac = device_id::read_mac();
    let client_id = device_id::client_id(&config.broker.client_id_prefix, &mac);
    info!("Client ID: {}", client_id);

    let handler = {
        let router = Arc::clone(&router);
        move |event: ConnectionEvent, client: &mut MqttClient| {
            router.deliver(event, client);
        }
    };
    let _mqtt = MqttAdapter::start(&config.broker, &client_id, handler)
        .map_err(Error::from)
        .context("MQTT client start")?;

    // ── 6. Status loop ────────────────────────────────────────
    // Commands are handled on the client task; this task only reports.
    loop {
        std::thread::sleep(STATUS_PERIOD);
        let status = router.status();
        info!(
            "STATUS | link={:?} wifi={} rssi={:?} connects={} matched={} rejected={} failed={} relays={:?}",
            status.link,
            wifi.is_connected(),
            wifi.rssi(),
            status.stats.connects,
            status.stats.matched,
            status.stats.rejected,
            status.stats.failed,
            status.relays,
        );
    }
}
