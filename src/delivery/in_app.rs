//! In-app channel: writes a notification row through the store.

use async_trait::async_trait;

use super::{ChannelKind, DeliveryChannel, DeliveryScript};
use crate::clock::SharedClock;
use crate::storage::SharedStore;
use crate::types::{CoachError, InAppNotification, Result};

pub struct InAppChannel {
    store: SharedStore,
    clock: SharedClock,
}

impl InAppChannel {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl DeliveryChannel for InAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn deliver(&self, script: &DeliveryScript) -> Result<()> {
        let notification = InAppNotification {
            rep_id: script.rep.id.clone(),
            body: script.text_body(),
            created_at: self.clock.now_utc(),
        };
        self.store
            .push_notification(&notification)
            .map_err(|e| CoachError::delivery("in_app", format!("store unavailable: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.store.ping().is_ok())
    }
}
