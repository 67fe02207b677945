//! Sync relay adapters.

use crate::domain::events::LedgerEvent;
use crate::ports::outbound::SyncRelay;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default channel capacity of `BroadcastSyncRelay`.
pub const DEFAULT_RELAY_CAPACITY: usize = 256;

/// Relay that drops every event (offline use).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSyncRelay;

impl SyncRelay for NoopSyncRelay {
    fn publish(&self, event: LedgerEvent) {
        tracing::trace!("[rx-03] Relay disabled, dropping {}", event.name());
    }
}

/// Relay fanning events out over a `tokio::sync::broadcast` channel.
///
/// A remote mirror subscribes and uploads at its own pace. With no
/// subscriber, or a lagging one, events are dropped.
pub struct BroadcastSyncRelay {
    sender: broadcast::Sender<LedgerEvent>,
}

impl BroadcastSyncRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RELAY_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSyncRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncRelay for BroadcastSyncRelay {
    fn publish(&self, event: LedgerEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "[rx-03] Relayed {}", name),
            Err(_) => tracing::debug!("[rx-03] No relay subscriber, dropped {}", name),
        }
    }
}

/// Relay that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSyncRelay {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSyncRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Names of published events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(LedgerEvent::name).collect()
    }
}

impl SyncRelay for RecordingSyncRelay {
    fn publish(&self, event: LedgerEvent) {
        self.events.lock().push(event);
    }
}
