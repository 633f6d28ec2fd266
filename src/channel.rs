//! Host channel abstraction for backend -> UI event delivery
//!
//! The coordinator only needs two capabilities from the transport: send an
//! event frame, and report whether the transport is still alive. Anything
//! that can carry JSON frames to the UI process satisfies this.

use crate::events::HostEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Transport seam between the coordinator and the UI process.
///
/// Implementations must tolerate sends after teardown: a send to a dead
/// transport is dropped, never an error surfaced to the coordinator.
pub trait HostChannel: Send + Sync {
    /// Deliver an event frame to the UI process (best effort)
    fn send_event(&self, event: HostEvent);

    /// Whether the underlying transport is still alive
    fn is_open(&self) -> bool;
}

/// Broadcasts events to all subscribed receivers in-process.
///
/// Hosts bridge the receiver side to their actual transport (WebSocket,
/// window emitter, stdio frames).
pub struct EventBroadcaster {
    tx: broadcast::Sender<HostEvent>,
    closed: AtomicBool,
}

impl EventBroadcaster {
    /// Create a new broadcaster with a channel capacity of 1000 events
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast(&self, event_type: &str, payload: impl serde::Serialize) {
        self.send_event(HostEvent::new(event_type, payload));
    }

    /// Subscribe to events (returns a receiver)
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// Mark the transport as torn down; subsequent sends are dropped
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl HostChannel for EventBroadcaster {
    fn send_event(&self, event: HostEvent) {
        if !self.is_open() {
            log::debug!("Host channel closed, dropping event {}", event.event);
            return;
        }
        // Ignore send errors (no receivers)
        let _ = self.tx.send(event);
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EVENT_SERVICE_STARTED;

    #[test]
    fn test_broadcast_reaches_subscriber() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(EVENT_SERVICE_STARTED, serde_json::json!({"token": "t"}));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, EVENT_SERVICE_STARTED);
        assert_eq!(event.payload["token"], "t");
    }

    #[test]
    fn test_send_without_subscribers_does_not_panic() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.broadcast(EVENT_SERVICE_STARTED, ());
    }

    #[test]
    fn test_closed_channel_drops_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.close();
        assert!(!broadcaster.is_open());

        broadcaster.broadcast(EVENT_SERVICE_STARTED, ());
        assert!(rx.try_recv().is_err());
    }
}
