//! MQTT client adapter.
//!
//! Implements [`BrokerPort`] over the ESP-MQTT client and hands every
//! notification to a caller-supplied handler on the client's own task.
//!
//! ```text
//!   esp-mqtt task ──▶ mqtt_event_handler ──▶ convert ──▶ on_event(event, client)
//!   on_event ──▶ BrokerPort::publish / subscribe ──▶ esp-mqtt outbox
//! ```
//!
//! The handler runs synchronously: the client does not read the next
//! packet until it returns, so a burst backs up in the client instead of
//! being dropped.  Publishing from inside the handler is allowed (the
//! client's API lock is recursive).
//!
//! The raw sys API is used because the error notification carries the
//! esp-tls / TLS stack / socket errno sub-codes that get logged.
//!
//! On host builds the client is a recorder: publishes and subscriptions
//! are stored, and tests feed notifications with [`MqttAdapter::inject`].

use log::info;

#[cfg(target_os = "espidf")]
use core::ffi::{c_char, c_void};
#[cfg(target_os = "espidf")]
use std::ffi::CString;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::app::events::{ConnectionEvent, ErrorKind, ErrorReport, InboundMessage};
use crate::app::ports::{BrokerError, BrokerPort, MessageId};
use crate::config::{BrokerConfig, QoS};

/// Return code ESP-MQTT uses for a full outbox.
const OUTBOX_FULL_RC: i32 = -2;

fn request_result(rc: i32) -> Result<MessageId, BrokerError> {
    match rc {
        rc if rc >= 0 => Ok(rc),
        OUTBOX_FULL_RC => Err(BrokerError::OutboxFull),
        rc => Err(BrokerError::Rejected(rc)),
    }
}

// ───────────────────────────────────────────────────────────────
// Event conversion
// ───────────────────────────────────────────────────────────────

// esp_mqtt_event_id_t
const EVENT_ERROR: i32 = 0;
const EVENT_CONNECTED: i32 = 1;
const EVENT_DISCONNECTED: i32 = 2;
const EVENT_SUBSCRIBED: i32 = 3;
const EVENT_UNSUBSCRIBED: i32 = 4;
const EVENT_PUBLISHED: i32 = 5;
const EVENT_DATA: i32 = 6;

// esp_mqtt_error_type_t
const ERROR_TYPE_TCP_TRANSPORT: u32 = 1;
const ERROR_TYPE_CONNECTION_REFUSED: u32 = 2;

#[cfg(target_os = "espidf")]
const _: () = {
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_ERROR as i32 == EVENT_ERROR);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_CONNECTED as i32 == EVENT_CONNECTED);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_DISCONNECTED as i32 == EVENT_DISCONNECTED);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_SUBSCRIBED as i32 == EVENT_SUBSCRIBED);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_UNSUBSCRIBED as i32 == EVENT_UNSUBSCRIBED);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_PUBLISHED as i32 == EVENT_PUBLISHED);
    assert!(esp_mqtt_event_id_t_MQTT_EVENT_DATA as i32 == EVENT_DATA);
    assert!(
        esp_mqtt_error_type_t_MQTT_ERROR_TYPE_TCP_TRANSPORT as u32 == ERROR_TYPE_TCP_TRANSPORT
    );
    assert!(
        esp_mqtt_error_type_t_MQTT_ERROR_TYPE_CONNECTION_REFUSED as u32
            == ERROR_TYPE_CONNECTION_REFUSED
    );
};

/// Error codes copied out of `esp_mqtt_error_codes_t`.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
#[derive(Debug, Clone, Copy, Default)]
struct RawErrorCodes {
    error_type: u32,
    connect_return_code: u32,
    esp_tls_last_esp_err: i32,
    esp_tls_stack_err: i32,
    esp_transport_sock_errno: i32,
}

/// The fields of `esp_mqtt_event_t` the converter reads.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
#[derive(Debug, Clone, Copy, Default)]
struct RawEvent<'a> {
    event_id: i32,
    msg_id: i32,
    topic: &'a [u8],
    data: &'a [u8],
    data_len: i32,
    total_data_len: i32,
    current_data_offset: i32,
    error: Option<RawErrorCodes>,
}

/// Large messages arrive as several DATA events; only the first carries
/// the topic.  Any of them on its own is a fragment.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn is_fragment(data_len: i32, total_data_len: i32, current_data_offset: i32) -> bool {
    current_data_offset != 0 || total_data_len != data_len
}

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn error_kind(error_type: u32, connect_return_code: u32) -> ErrorKind {
    match error_type {
        ERROR_TYPE_TCP_TRANSPORT => ErrorKind::Transport,
        ERROR_TYPE_CONNECTION_REFUSED => ErrorKind::ConnectionRefused(connect_return_code as i32),
        other => ErrorKind::Other(other as i32),
    }
}

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn convert(raw: &RawEvent<'_>) -> ConnectionEvent {
    match raw.event_id {
        EVENT_CONNECTED => ConnectionEvent::Connected,
        EVENT_DISCONNECTED => ConnectionEvent::Disconnected,
        EVENT_SUBSCRIBED => ConnectionEvent::Subscribed { msg_id: raw.msg_id },
        EVENT_UNSUBSCRIBED => ConnectionEvent::Unsubscribed { msg_id: raw.msg_id },
        EVENT_PUBLISHED => ConnectionEvent::Published { msg_id: raw.msg_id },
        EVENT_DATA => {
            let topic = core::str::from_utf8(raw.topic).unwrap_or("");
            let fragment = is_fragment(raw.data_len, raw.total_data_len, raw.current_data_offset);
            ConnectionEvent::DataReceived(
                InboundMessage::new(topic, raw.data).with_truncated(fragment),
            )
        }
        EVENT_ERROR => {
            let codes = raw.error.unwrap_or_default();
            let kind = match raw.error {
                Some(c) => error_kind(c.error_type, c.connect_return_code),
                None => ErrorKind::Other(-1),
            };
            ConnectionEvent::Error(ErrorReport {
                kind,
                tls_last_esp_err: codes.esp_tls_last_esp_err,
                tls_stack_err: codes.esp_tls_stack_err,
                sock_errno: codes.esp_transport_sock_errno,
            })
        }
        event_id => ConnectionEvent::Other { event_id },
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

/// Outbound half of a started client.  A plain handle; the event handler
/// receives one to publish from the client task.
#[cfg(target_os = "espidf")]
#[derive(Clone, Copy)]
pub struct MqttClient {
    handle: esp_mqtt_client_handle_t,
}

#[cfg(target_os = "espidf")]
struct Registration<H> {
    client: MqttClient,
    on_event: H,
}

#[cfg(target_os = "espidf")]
pub struct MqttAdapter<H> {
    client: MqttClient,
    // Config strings and the handler, held for the lifetime of the handle.
    _uri: CString,
    _client_id: CString,
    registration: Box<Registration<H>>,
}

#[cfg(target_os = "espidf")]
impl<H> MqttAdapter<H>
where
    H: Fn(ConnectionEvent, &mut MqttClient) + Send + Sync + 'static,
{
    /// Create the client, route its events into `on_event`, and start it.
    /// Connection and reconnection then run on the client's own task.
    pub fn start(broker: &BrokerConfig, client_id: &str, on_event: H) -> Result<Self, BrokerError> {
        let uri = CString::new(broker.uri.as_str())
            .map_err(|_| BrokerError::InvalidArgument("broker uri"))?;
        let client_id_c =
            CString::new(client_id).map_err(|_| BrokerError::InvalidArgument("client id"))?;

        let mut cfg = esp_mqtt_client_config_t::default();
        cfg.broker.address.uri = uri.as_ptr();
        cfg.credentials.client_id = client_id_c.as_ptr();

        // SAFETY: cfg and the strings it points to outlive the call; the
        // client copies what it needs and the CStrings live in `Self`.
        let handle = unsafe { esp_mqtt_client_init(&cfg) };
        if handle.is_null() {
            return Err(BrokerError::InitFailed);
        }
        let client = MqttClient { handle };

        let adapter = Self {
            client,
            _uri: uri,
            _client_id: client_id_c,
            registration: Box::new(Registration { client, on_event }),
        };

        // SAFETY: the registration is boxed and owned by the adapter, whose
        // Drop destroys the client before the box is freed.
        let rc = unsafe {
            esp_mqtt_client_register_event(
                handle,
                esp_mqtt_event_id_t_MQTT_EVENT_ANY,
                Some(mqtt_event_handler::<H>),
                &*adapter.registration as *const Registration<H> as *mut c_void,
            )
        };
        if rc != ESP_OK {
            return Err(BrokerError::StartFailed(rc));
        }

        let rc = unsafe { esp_mqtt_client_start(handle) };
        if rc != ESP_OK {
            return Err(BrokerError::StartFailed(rc));
        }

        info!("MQTT: client '{}' started for {}", client_id, broker.uri);
        Ok(adapter)
    }

    pub fn client(&self) -> MqttClient {
        self.client
    }
}

#[cfg(target_os = "espidf")]
impl BrokerPort for MqttClient {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, BrokerError> {
        let topic = CString::new(topic).map_err(|_| BrokerError::InvalidArgument("topic"))?;
        let len = i32::try_from(payload.len())
            .map_err(|_| BrokerError::InvalidArgument("payload length"))?;
        // SAFETY: the handle is live while its adapter is; the call copies
        // topic and payload into the outbox before returning.
        let rc = unsafe {
            esp_mqtt_client_publish(
                self.handle,
                topic.as_ptr(),
                payload.as_ptr() as *const c_char,
                len,
                i32::from(qos.level()),
                0,
            )
        };
        request_result(rc)
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, BrokerError> {
        let topic = CString::new(topic).map_err(|_| BrokerError::InvalidArgument("topic"))?;
        // SAFETY: as for publish.
        let rc = unsafe {
            esp_mqtt_client_subscribe_single(self.handle, topic.as_ptr(), i32::from(qos.level()))
        };
        request_result(rc)
    }
}

#[cfg(target_os = "espidf")]
impl<H> Drop for MqttAdapter<H> {
    fn drop(&mut self) {
        // SAFETY: handle came from esp_mqtt_client_init and is dropped once.
        unsafe {
            esp_mqtt_client_destroy(self.client.handle);
        }
    }
}

/// Runs on the ESP-MQTT task.  Copies the notification out of the
/// client's buffers and dispatches it before returning.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn mqtt_event_handler<H>(
    handler_arg: *mut c_void,
    _base: esp_event_base_t,
    event_id: i32,
    event_data: *mut c_void,
) where
    H: Fn(ConnectionEvent, &mut MqttClient) + Send + Sync + 'static,
{
    if handler_arg.is_null() || event_data.is_null() {
        return;
    }
    // SAFETY: handler_arg is the Registration boxed in start(); event_data
    // is the client's event struct, valid for this call only.
    let (registration, event) = unsafe {
        (
            &*(handler_arg as *const Registration<H>),
            &*(event_data as *const esp_mqtt_event_t),
        )
    };

    // SAFETY: topic/data point into the client's receive buffer and a
    // non-null error_handle is valid alongside the event.
    let raw = unsafe {
        RawEvent {
            event_id,
            msg_id: event.msg_id,
            topic: raw_bytes(event.topic, event.topic_len),
            data: raw_bytes(event.data, event.data_len),
            data_len: event.data_len,
            total_data_len: event.total_data_len,
            current_data_offset: event.current_data_offset,
            error: event.error_handle.as_ref().map(|codes| RawErrorCodes {
                error_type: codes.error_type as u32,
                connect_return_code: codes.connect_return_code as u32,
                esp_tls_last_esp_err: codes.esp_tls_last_esp_err,
                esp_tls_stack_err: codes.esp_tls_stack_err,
                esp_transport_sock_errno: codes.esp_transport_sock_errno,
            }),
        }
    };

    let mut client = registration.client;
    (registration.on_event)(convert(&raw), &mut client);
}

/// `len` bytes at `ptr`, or an empty slice for null / non-positive length.
#[cfg(target_os = "espidf")]
unsafe fn raw_bytes<'a>(ptr: *const c_char, len: i32) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        // SAFETY: caller guarantees `len` readable bytes at `ptr`.
        unsafe { core::slice::from_raw_parts(ptr as *const u8, len as usize) }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// One recorded publish: topic, payload, QoS.
#[cfg(not(target_os = "espidf"))]
pub type SimPublish = (String, Vec<u8>, QoS);

/// Recording client: keeps every accepted request.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
pub struct MqttClient {
    next_msg_id: MessageId,
    /// Force the next request to fail with this return code.
    fail_rc: Option<i32>,
    pub published: Vec<SimPublish>,
    pub subscriptions: Vec<(String, QoS)>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttClient {
    fn new() -> Self {
        Self {
            next_msg_id: 1,
            fail_rc: None,
            published: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Make the next publish or subscribe return `rc`.
    pub fn fail_next(&mut self, rc: i32) {
        self.fail_rc = Some(rc);
    }

    fn next_id(&mut self) -> i32 {
        if let Some(rc) = self.fail_rc.take() {
            return rc;
        }
        let id = self.next_msg_id;
        self.next_msg_id = self.next_msg_id.wrapping_add(1).max(1);
        id
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttClient {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, BrokerError> {
        let msg_id = request_result(self.next_id())?;
        self.published.push((topic.into(), payload.to_vec(), qos));
        Ok(msg_id)
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, BrokerError> {
        let msg_id = request_result(self.next_id())?;
        self.subscriptions.push((topic.into(), qos));
        Ok(msg_id)
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter<H> {
    client: MqttClient,
    client_id: String,
    on_event: H,
}

#[cfg(not(target_os = "espidf"))]
impl<H> MqttAdapter<H>
where
    H: Fn(ConnectionEvent, &mut MqttClient),
{
    pub fn start(broker: &BrokerConfig, client_id: &str, on_event: H) -> Result<Self, BrokerError> {
        if broker.uri.contains('\0') {
            return Err(BrokerError::InvalidArgument("broker uri"));
        }
        if client_id.contains('\0') {
            return Err(BrokerError::InvalidArgument("client id"));
        }
        info!("MQTT(sim): client '{}' started for {}", client_id, broker.uri);
        Ok(Self {
            client: MqttClient::new(),
            client_id: client_id.into(),
            on_event,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Deliver a notification as the client task would: synchronously,
    /// with the client handed to the handler.
    pub fn inject(&mut self, event: ConnectionEvent) {
        (self.on_event)(event, &mut self.client);
    }

    pub fn client(&self) -> &MqttClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut MqttClient {
        &mut self.client
    }
}
