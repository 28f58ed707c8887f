//! Boot diagnostics and logging setup.
//!
//! Heap figures and the IDF version are logged once at startup.  The
//! ESP-IDF per-tag log levels are raised for the MQTT and transport
//! components so broker trouble is visible on the console.

/// ESP-IDF log tags raised to verbose at boot.
pub const VERBOSE_TAGS: [&str; 5] = ["mqtt_client", "transport_base", "esp-tls", "transport", "outbox"];

/// Memory and firmware facts reported at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootInfo {
    pub heap_free: u32,
    pub heap_min_free: u32,
    pub idf_version: heapless::String<32>,
}

impl BootInfo {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: plain reads of allocator counters and a static string.
        let (heap_free, heap_min_free, version) = unsafe {
            (
                esp_get_free_heap_size(),
                esp_get_minimum_free_heap_size(),
                core::ffi::CStr::from_ptr(esp_get_idf_version()),
            )
        };
        Self {
            heap_free,
            heap_min_free,
            idf_version: crate::config::bounded(version.to_str().unwrap_or("unknown")),
        }
    }

    /// Synthetic values so host runs exercise the same logging path.
    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            heap_free: 307_200,
            heap_min_free: 261_120,
            idf_version: crate::config::bounded("sim"),
        }
    }

    pub fn log(&self) {
        log::info!("[APP] Startup..");
        log::info!("[APP] Free memory: {} bytes", self.heap_free);
        log::info!("[APP] Min free memory: {} bytes", self.heap_min_free);
        log::info!("[APP] IDF version: {}", self.idf_version);
    }
}

/// Set the ESP-IDF per-tag log levels: INFO globally, VERBOSE for the
/// MQTT client and its transports.
#[cfg(target_os = "espidf")]
pub fn apply_log_levels() {
    use esp_idf_svc::sys::*;
    // SAFETY: literal NUL-terminated tags; esp_log_level_set copies them.
    unsafe {
        esp_log_level_set(c"*".as_ptr(), esp_log_level_t_ESP_LOG_INFO);
        esp_log_level_set(c"mqtt_client".as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
        esp_log_level_set(c"transport_base".as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
        esp_log_level_set(c"esp-tls".as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
        esp_log_level_set(c"transport".as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
        esp_log_level_set(c"outbox".as_ptr(), esp_log_level_t_ESP_LOG_VERBOSE);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn apply_log_levels() {
    log::debug!("log levels(sim): * = INFO, verbose: {:?}", VERBOSE_TAGS);
}

/// Install a panic hook that logs the reason before the default abort.
///
/// Call once during init, after the logger is up.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("PANIC: {}", panic_reason(info.payload()));
        if let Some(loc) = info.location() {
            log::error!("PANIC at {}:{}", loc.file(), loc.line());
        }
    }));
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
