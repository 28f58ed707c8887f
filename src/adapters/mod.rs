//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to              |
//! |-------------|--------------------|--------------------------|
//! | `hardware`  | RelayPort          | ESP32 GPIO outputs       |
//! | `log_sink`  | EventSink          | Serial log output        |
//! | `mqtt`      | BrokerPort         | ESP-MQTT client          |
//! | `nvs`       | ConfigPort         | NVS / in-memory store    |
//! | `wifi`      | ConnectivityPort   | ESP-IDF WiFi STA         |
//!
//! `device_id` derives the broker client id from the factory MAC.

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub(super) mod utils;
pub mod wifi;
