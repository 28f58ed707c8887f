//! Device identity derived from the ESP32 factory MAC address.
//!
//! The broker client id is the configured prefix followed by the last
//! three MAC bytes in lowercase hex, e.g. `relayctl-efcafe`.  Stable
//! across reboots, unique per board.

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Client id buffer: 16-char prefix + '-' + 6 hex digits.
pub type ClientIdString = heapless::String<24>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: buffer is exactly the 6 bytes the call writes.
    let rc = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("eFuse MAC read failed (rc={}), using zeros", rc);
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `<prefix>-xxyyzz` from the last 3 MAC bytes.
pub fn client_id(prefix: &str, mac: &MacAddress) -> ClientIdString {
    use core::fmt::Write;
    let mut id = ClientIdString::new();
    let _ = write!(id, "{}-{:02x}{:02x}{:02x}", prefix, mac[3], mac[4], mac[5]);
    id
}
