//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing dispatcher events to the ESP-IDF
//! logger (UART in production).  Unmatched commands, relay faults and
//! transport error codes go out at error level; everything else is
//! informational.

use core::ffi::{CStr, c_char, c_int};

use log::{error, info, warn};

use crate::app::events::{AckKind, AppEvent, ErrorKind, ErrorReport};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Connected => info!("MQTT_EVENT_CONNECTED"),
            AppEvent::Disconnected => info!("MQTT_EVENT_DISCONNECTED"),
            AppEvent::GreetingQueued { msg_id } => {
                info!("sent publish successful, msg_id={}", msg_id);
            }
            AppEvent::GreetingFailed(e) => error!("greeting publish failed: {}", e),
            AppEvent::SubscribeQueued { msg_id } => {
                info!("sent subscribe successful, msg_id={}", msg_id);
            }
            AppEvent::SubscribeFailed(e) => error!("subscribe failed: {}", e),
            AppEvent::Acknowledged { kind, msg_id } => {
                let name = match kind {
                    AckKind::Subscribed => "SUBSCRIBED",
                    AckKind::Unsubscribed => "UNSUBSCRIBED",
                    AckKind::Published => "PUBLISHED",
                };
                info!("MQTT_EVENT_{}, msg_id={}", name, msg_id);
            }
            AppEvent::MessageReceived(msg) => {
                info!(
                    "MQTT_EVENT_DATA | TOPIC={} | DATA={}{}",
                    msg.topic,
                    msg.payload_str(),
                    if msg.truncated { " (truncated)" } else { "" },
                );
            }
            AppEvent::RelaySwitched(cmd) => info!("RELAY | {}", cmd),
            AppEvent::RelayFailed { command, error } => {
                error!("RELAY | {} not applied: {}", command, error);
            }
            AppEvent::CommandRejected(msg) => {
                error!("Invalid command: {}", msg.payload_str());
            }
            AppEvent::BrokerFault(report) => log_fault(report),
            AppEvent::RelayStatus(states) => {
                info!(
                    "RELAY | status 1={} 2={} 3={} 4={}",
                    states[0], states[1], states[2], states[3]
                );
            }
            AppEvent::Unhandled { event_id } => info!("Other event id:{}", event_id),
        }
    }
}

fn log_fault(report: &ErrorReport) {
    match report.kind {
        ErrorKind::Transport => {
            info!("MQTT_EVENT_ERROR");
            let codes = [
                ("reported from esp-tls", report.tls_last_esp_err),
                ("reported from tls stack", report.tls_stack_err),
                ("captured as transport's socket errno", report.sock_errno),
            ];
            for (source, code) in codes {
                if code != 0 {
                    error!("Last error {}: 0x{:x}", source, code);
                }
            }
            info!("Last errno string ({})", errno_text(report.sock_errno));
        }
        ErrorKind::ConnectionRefused(code) => {
            warn!("MQTT_EVENT_ERROR | connection refused, code=0x{:x}", code);
        }
        ErrorKind::Other(kind) => info!("MQTT_EVENT_ERROR | type={}", kind),
    }
}

unsafe extern "C" {
    fn strerror(errnum: c_int) -> *const c_char;
}

/// C library text for `errno`.
fn errno_text(errno: i32) -> String {
    // SAFETY: strerror returns a NUL-terminated string that stays valid
    // until the next call; it is copied out immediately.
    let text = unsafe { strerror(errno) };
    if text.is_null() {
        return format!("errno {}", errno);
    }
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}
