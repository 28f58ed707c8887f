//! System configuration parameters
//!
//! Everything the firmware used to hard-code: relay pin map, broker
//! endpoint, control topic, greeting and QoS, plus station credentials.
//! `Default` reproduces the factory values; NVS may override them.

use serde::{Deserialize, Serialize};

use crate::pins;

/// Capacity of the broker URI string.
pub const URI_CAP: usize = 96;
/// Capacity of topic and greeting strings.
pub const TOPIC_CAP: usize = 64;

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    /// Numeric level as carried on the wire.
    pub const fn level(self) -> u8 {
        self as u8
    }
}

/// Relay line → GPIO mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// GPIO per relay, indexed by relay number minus one.
    pub gpios: [i32; 4],
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gpios: pins::DEFAULT_RELAY_GPIOS,
        }
    }
}

/// Broker connection and topic contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker URI, e.g. `mqtt://mqtt.eclipseprojects.io`
    pub uri: heapless::String<URI_CAP>,
    /// Prefix for the MAC-derived client id
    pub client_id_prefix: heapless::String<16>,
    /// Single topic used for both the greeting and the command subscription
    pub topic: heapless::String<TOPIC_CAP>,
    /// Payload published once per successful connect
    pub greeting: heapless::String<TOPIC_CAP>,
    /// QoS for both publish and subscribe
    pub qos: QoS,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            uri: bounded("mqtt://mqtt.eclipseprojects.io"),
            client_id_prefix: bounded("relayctl"),
            topic: bounded("data"),
            greeting: bounded("Publish from ESP32_4RELAY"),
            qos: QoS::AtLeastOnce,
        }
    }
}

/// Station-mode credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: bounded(option_env!("RELAYCTL_WIFI_SSID").unwrap_or("")),
            password: bounded(option_env!("RELAYCTL_WIFI_PASSWORD").unwrap_or("")),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub relays: RelayConfig,
    pub broker: BrokerConfig,
    pub wifi: WifiConfig,
}

/// Copy `s` into a fixed-capacity string, cutting at the last whole
/// character that fits.
pub fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
