//! Broker event delivery.
//!
//! The MQTT client invokes its event handler on its own task, one event
//! at a time.  The handler passes each [`ConnectionEvent`] straight to an
//! [`EventRouter`], which runs the dispatcher under a mutex before the
//! handler returns.
//!
//! ```text
//! ┌──────────────┐ ConnectionEvent ┌─────────────┐     ┌──────────────┐
//! │ MQTT task    │────────────────▶│ EventRouter │────▶│  Dispatcher  │
//! │ (C callback) │   deliver()     │   (mutex)   │     │  + relays    │
//! └──────────────┘                 └─────────────┘     └──────────────┘
//!                                        ▲
//!                       status() ────────┘  main task
//! ```
//!
//! Nothing is queued, so nothing can be dropped: while one event is being
//! dispatched the client holds the next one.  The mutex is what keeps the
//! relay lines single-writer when the main task reads status.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::commands::RelayState;
use crate::app::events::ConnectionEvent;
use crate::app::ports::{BrokerPort, EventSink, RelayPort};
use crate::app::service::{DispatchStats, Dispatcher, Disposition, LinkState};

/// Point-in-time view for the periodic status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterStatus {
    pub link: LinkState,
    pub stats: DispatchStats,
    pub relays: [RelayState; 4],
}

struct Routed<R, S> {
    dispatcher: Dispatcher,
    relays: R,
    sink: S,
}

/// Dispatcher, relay lines and sink behind one lock.
pub struct EventRouter<R, S> {
    inner: Mutex<Routed<R, S>>,
}

impl<R: RelayPort, S: EventSink> EventRouter<R, S> {
    pub fn new(dispatcher: Dispatcher, relays: R, sink: S) -> Self {
        Self {
            inner: Mutex::new(Routed {
                dispatcher,
                relays,
                sink,
            }),
        }
    }

    /// Dispatch one event.  Blocks while another delivery or a status
    /// read holds the lock.
    pub fn deliver(&self, event: ConnectionEvent, broker: &mut impl BrokerPort) -> Disposition {
        let mut guard = self.lock();
        let Routed {
            dispatcher,
            relays,
            sink,
        } = &mut *guard;
        dispatcher.handle(event, relays, broker, sink)
    }

    pub fn status(&self) -> RouterStatus {
        let guard = self.lock();
        RouterStatus {
            link: guard.dispatcher.link_state(),
            stats: guard.dispatcher.stats(),
            relays: guard.relays.snapshot(),
        }
    }

    /// Run `f` against the relay lines and sink with the lock held.
    pub fn inspect<T>(&self, f: impl FnOnce(&R, &S) -> T) -> T {
        let guard = self.lock();
        f(&guard.relays, &guard.sink)
    }

    fn lock(&self) -> MutexGuard<'_, Routed<R, S>> {
        // A panicking delivery leaves plain data behind; keep serving.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
