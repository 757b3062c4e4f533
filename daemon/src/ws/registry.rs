// ws/registry.rs — live observer set + best-effort broadcast.
//
// Each WebSocket connection registers the sending half of an unbounded
// channel here; a per-connection writer task drains the receiving half into
// the socket. Broadcast therefore never blocks on a slow peer — a hung
// socket only backs up its own queue.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub type ConnectionId = u64;

/// Tracks every currently-connected observer and fans events out to all of
/// them. One instance lives in `AppContext`; tests create their own.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: Mutex<HashMap<ConnectionId, UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer's outbound queue to the live set.
    pub fn connect(&self, tx: UnboundedSender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients
            .lock()
            .expect("connection registry lock poisoned")
            .insert(id, tx);
        debug!(conn = id, "observer connected");
        id
    }

    /// Remove an observer. Safe to call more than once for the same id.
    pub fn disconnect(&self, id: ConnectionId) {
        let removed = self
            .clients
            .lock()
            .expect("connection registry lock poisoned")
            .remove(&id)
            .is_some();
        if removed {
            debug!(conn = id, "observer disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .expect("connection registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `{"event", "payload"}` to every live observer.
    ///
    /// The message is serialized once. Delivery runs over a snapshot of the
    /// live set taken up front; a failed enqueue marks that observer dead,
    /// and the dead ones are removed only after the sweep finishes, so
    /// removal never races the iteration. Failures are swallowed — a
    /// broadcast must never fail the mutation that triggered it.
    pub fn broadcast(&self, event: &str, payload: Value) {
        let message = serde_json::json!({ "event": event, "payload": payload }).to_string();

        let snapshot: Vec<(ConnectionId, UnboundedSender<String>)> = {
            let clients = self
                .clients
                .lock()
                .expect("connection registry lock poisoned");
            clients.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut stale: Vec<ConnectionId> = Vec::new();
        for (id, tx) in &snapshot {
            if tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }

        if !stale.is_empty() {
            let mut clients = self
                .clients
                .lock()
                .expect("connection registry lock poisoned");
            for id in &stale {
                clients.remove(id);
            }
            debug!(event, dropped = stale.len(), "pruned dead observers after broadcast");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_broadcast_reaches_every_observer() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.connect(tx_a);
        registry.connect(tx_b);

        registry.broadcast("created", json!({"id": 1}));

        let expected = r#"{"event":"created","payload":{"id":1}}"#;
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
    }

    #[test]
    fn test_failed_deliveries_prune_exactly_the_dead() {
        let registry = ConnectionRegistry::new();
        let mut live_rxs = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.connect(tx);
            live_rxs.push(rx);
        }
        // Two observers whose receiving half is already gone.
        for _ in 0..2 {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.connect(tx);
            drop(rx);
        }
        assert_eq!(registry.len(), 5);

        registry.broadcast("updated", json!({"id": 7}));

        assert_eq!(registry.len(), 3, "exactly the failed connections are removed");
        for rx in &mut live_rxs {
            assert!(rx.try_recv().is_ok(), "live observers still get the message");
        }
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.connect(tx);
        assert_eq!(registry.len(), 1);

        registry.disconnect(id);
        assert_eq!(registry.len(), 0);
        registry.disconnect(id);
        assert_eq!(registry.len(), 0, "second disconnect is a no-op");
    }

    #[test]
    fn test_broadcast_to_empty_registry_is_fine() {
        let registry = ConnectionRegistry::new();
        registry.broadcast("deleted", json!({"id": 1}));
        assert!(registry.is_empty());
    }
}
