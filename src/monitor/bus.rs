//! Activity bus.
//!
//! Single entry point for rep actions. Every event is written to the store
//! before it is forwarded to the subscribed monitor, so stats computed by
//! the monitor already include the event that triggered them.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::storage::SharedStore;
use crate::types::{ActivityEvent, RepId, Result};

pub struct ActivityBus {
    store: SharedStore,
    subscribers: DashMap<RepId, mpsc::Sender<ActivityEvent>>,
    capacity: usize,
}

impl ActivityBus {
    pub fn new(store: SharedStore, capacity: usize) -> Self {
        Self {
            store,
            subscribers: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Replace any existing subscription for the rep
    pub fn subscribe(&self, rep_id: &RepId) -> mpsc::Receiver<ActivityEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.insert(rep_id.clone(), tx);
        rx
    }

    pub fn unsubscribe(&self, rep_id: &RepId) {
        self.subscribers.remove(rep_id);
    }

    pub fn is_subscribed(&self, rep_id: &RepId) -> bool {
        self.subscribers.contains_key(rep_id)
    }

    /// Record then forward. Events the store already holds are not forwarded,
    /// so a restarted monitor never sees a replay. A store failure is returned
    /// after forwarding so the monitor still sees the event.
    pub async fn publish(&self, event: ActivityEvent) -> Result<()> {
        let recorded = self.store.record_event(&event);
        match &recorded {
            Ok(false) => {
                debug!(call_id = %event.call_id, kind = %event.kind, "Duplicate event");
                return Ok(());
            }
            Err(e) => warn!(rep_id = %event.rep_id, error = %e, "Failed to record event"),
            Ok(true) => {}
        }

        let sender = self
            .subscribers
            .get(&event.rep_id)
            .map(|entry| entry.value().clone());
        if let Some(tx) = sender {
            let rep_id = event.rep_id.clone();
            if tx.send(event).await.is_err() {
                debug!(rep_id = %rep_id, "Monitor gone, dropping subscription");
                self.subscribers
                    .remove_if(&rep_id, |_, current| current.same_channel(&tx));
            }
        }

        recorded.map(|_| ())
    }

    /// Record that the rep researched a contact
    pub fn publish_research(
        &self,
        rep_id: &RepId,
        contact_id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        self.store.record_research(rep_id, contact_id, at)
    }
}
