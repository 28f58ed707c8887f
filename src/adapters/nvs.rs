//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the relay controller.  The whole
//! [`SystemConfig`] is one postcard blob under `relayctl/syscfg`.
//!
//! - Validation: every field is checked before persistence, and a stored
//!   blob that fails validation is ignored in favour of defaults.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - The simulation backend is an in-memory map (dev/test only).

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use crate::pins;

use super::utils::is_printable_ascii;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "relayctl";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "syscfg";
#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"syscfg\0";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

/// URI schemes the ESP-MQTT client accepts.
const BROKER_SCHEMES: [&str; 4] = ["mqtt://", "mqtts://", "ws://", "wss://"];

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised.  Any other failure is `ConfigError::IoError`.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Raw blob read; `Ok(None)` when nothing is stored.
    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, i32> {
        let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                return Err(ret);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });

        match result {
            Ok(buf) => Ok(Some(buf)),
            // Namespace not created yet, or key missing.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, i32> {
        Ok(self.store.borrow().get(&Self::composite_key()).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), i32> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(), bytes.to_vec());
        Ok(())
    }

    /// True once a config blob has been written, valid or not.
    pub fn is_provisioned(&self) -> bool {
        matches!(self.read_blob(), Ok(Some(_)))
    }

    /// Store raw bytes under the config key, bypassing validation.
    #[cfg(test)]
    fn poke(&self, bytes: &[u8]) {
        let _ = self.write_blob(bytes);
    }
}

/// Check every field of `cfg`.  Returns the first failure.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    let gpios = &cfg.relays.gpios;
    if !gpios.iter().all(|&g| pins::is_output_capable(g)) {
        return Err(ConfigError::ValidationFailed(
            "relay GPIOs must be output-capable (0-33, not 6-11)",
        ));
    }
    for (i, g) in gpios.iter().enumerate() {
        if gpios[i + 1..].contains(g) {
            return Err(ConfigError::ValidationFailed("relay GPIOs must be distinct"));
        }
    }

    let broker = &cfg.broker;
    if !BROKER_SCHEMES.iter().any(|s| broker.uri.starts_with(s))
        || BROKER_SCHEMES.iter().any(|s| broker.uri.as_str() == *s)
    {
        return Err(ConfigError::ValidationFailed(
            "broker uri must be mqtt://, mqtts://, ws:// or wss:// with a host",
        ));
    }
    if broker.topic.is_empty() {
        return Err(ConfigError::ValidationFailed("topic must not be empty"));
    }
    if broker.topic.contains(['+', '#']) {
        return Err(ConfigError::ValidationFailed("topic must not contain wildcards"));
    }
    if broker.client_id_prefix.is_empty() || !is_printable_ascii(&broker.client_id_prefix) {
        return Err(ConfigError::ValidationFailed(
            "client id prefix must be non-empty printable ASCII",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let bytes = match self.read_blob() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                return Ok(SystemConfig::default());
            }
            Err(_e) => {
                #[cfg(target_os = "espidf")]
                warn!("NvsAdapter: NVS read error {}, using defaults", _e);
                return Ok(SystemConfig::default());
            }
        };

        let cfg: SystemConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("NvsAdapter: loaded config from store ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        match self.write_blob(&bytes) {
            Ok(()) => {
                info!("NvsAdapter: config saved ({} bytes)", bytes.len());
                Ok(())
            }
            Err(_e) => {
                #[cfg(target_os = "espidf")]
                warn!("NvsAdapter: NVS write error {}", _e);
                Err(ConfigError::IoError)
            }
        }
    }
}
