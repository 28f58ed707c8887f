//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity.  Bring-up is blocking: [`connect`](ConnectivityPort::connect)
//! returns once the station has an IP address, or with an error.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver via `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! Reconnection after a dropped link is left to the ESP-IDF driver; the
//! broker client retries on its own once the netif is back.

use core::fmt;
use log::{error, info};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};

use crate::config::{WifiConfig, bounded};

use super::utils::is_printable_ascii;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    /// Driver not attached (espidf) or link bring-up failed.
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => f.write_str("station SSID not set"),
            Self::InvalidSsid => f.write_str("SSID must be 1-32 printable ASCII bytes"),
            Self::InvalidPassword => f.write_str("passphrase must be empty (open) or 8-64 bytes"),
            Self::ConnectionFailed => f.write_str("station did not come up"),
            Self::AlreadyConnected => f.write_str("station already associated"),
        }
    }
}

pub trait ConnectivityPort {
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn is_connected(&self) -> bool;
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

/// SSID: 1-32 printable bytes. Passphrase: empty for open networks,
/// otherwise the WPA2 range of 8-64 bytes.
fn validate_credentials(ssid: &str, password: &str) -> Result<(), ConnectivityError> {
    if !(1..=32).contains(&ssid.len()) || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    match password.len() {
        0 | 8..=64 => Ok(()),
        _ => Err(ConnectivityError::InvalidPassword),
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: Option<BlockingWifi<EspWifi<'static>>>,
    /// Simulation: fail the next connect attempt.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: bool,
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            #[cfg(target_os = "espidf")]
            driver: None,
            #[cfg(not(target_os = "espidf"))]
            sim_fail_next: false,
        }
    }

    /// Adapter with credentials taken from `config`.
    pub fn from_config(config: &WifiConfig) -> Result<Self, ConnectivityError> {
        let mut adapter = Self::new();
        adapter.set_credentials(&config.ssid, &config.password)?;
        Ok(adapter)
    }

    /// Hand over the ESP-IDF driver built from the modem peripheral.
    #[cfg(target_os = "espidf")]
    pub fn attach_driver(&mut self, driver: BlockingWifi<EspWifi<'static>>) {
        self.driver = Some(driver);
    }

    /// Make the next simulated connect fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_connect(&mut self) {
        self.sim_fail_next = true;
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let wifi = self.driver.as_mut().ok_or(ConnectivityError::ConnectionFailed)?;

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };

        let step = |what: &str, r: Result<(), esp_idf_svc::sys::EspError>| {
            r.map_err(|e| {
                error!("WiFi(espidf): {} failed: {}", what, e);
                ConnectivityError::ConnectionFailed
            })
        };
        step("set_configuration", wifi.set_configuration(&Configuration::Client(client)))?;
        step("start", wifi.start())?;
        step("connect", wifi.connect())?;
        step("wait_netif_up", wifi.wait_netif_up())?;

        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi(espidf): got ip {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if core::mem::take(&mut self.sim_fail_next) {
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.driver
            .as_ref()
            .and_then(|wifi| wifi.is_connected().ok())
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: out-parameter fully written on ESP_OK.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        (self.state == WifiState::Connected).then_some(-60)
    }
}

impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        match (self.ssid.is_empty(), self.state) {
            (true, _) => return Err(ConnectivityError::NoCredentials),
            (_, WifiState::Connected) => return Err(ConnectivityError::AlreadyConnected),
            _ => {}
        }

        info!("WiFi: joining '{}'", self.ssid);
        self.state = WifiState::Connecting;

        if let Err(e) = self.platform_connect() {
            error!("WiFi: {}", e);
            self.state = WifiState::Failed;
            return Err(e);
        }
        self.state = WifiState::Connected;
        info!("WiFi: up, RSSI {:?} dBm", self.platform_rssi());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_credentials(ssid, password)?;
        self.ssid = bounded(ssid);
        self.password = bounded(password);
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Signal strength of the current association, read fresh.
    fn rssi(&self) -> Option<i8> {
        if self.is_connected() { self.platform_rssi() } else { None }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
