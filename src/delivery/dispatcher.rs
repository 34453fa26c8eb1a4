//! Coaching Dispatcher
//!
//! `deliver` turns a directive into exactly one persisted session:
//!
//! 1. Append the session as `delivered` (store failure: log, degrade rep, continue)
//! 2. Spawn transport over the severity's route; each attempt leaves a receipt
//! 3. Apply the mode's score delta
//!
//! Transport runs in the background and never blocks steps 1 or 3.
//! In-flight deliveries are tracked so shutdown can drain them.

use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::router::ChannelRouter;
use super::{ChannelKind, DeliveryScript, route_for};
use crate::clock::SharedClock;
use crate::health::HealthBoard;
use crate::performance::PerformanceModel;
use crate::persona::{Mood, PersonaGenerator, PhraseContext, category};
use crate::storage::SharedStore;
use crate::types::{CoachingDirective, CoachingSession, DeliveryReceipt, ReceiptStatus, RepIdentity};

pub struct Dispatcher {
    store: SharedStore,
    router: Arc<ChannelRouter>,
    performance: Arc<PerformanceModel>,
    persona: Arc<PersonaGenerator>,
    health: Arc<HealthBoard>,
    clock: SharedClock,
    in_flight: Mutex<JoinSet<()>>,
}

impl Dispatcher {
    pub fn new(
        store: SharedStore,
        router: Arc<ChannelRouter>,
        performance: Arc<PerformanceModel>,
        persona: Arc<PersonaGenerator>,
        health: Arc<HealthBoard>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            router,
            performance,
            persona,
            health,
            clock,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    #[instrument(skip_all, fields(rep_id = %rep.id, mode = %directive.mode, severity = %directive.severity))]
    pub async fn deliver(&self, rep: &RepIdentity, directive: CoachingDirective) -> CoachingSession {
        let session = CoachingSession::delivered(&rep.id, &directive, self.clock.now_utc());

        if let Err(e) = self.store.append_session(&session) {
            warn!(error = %e, "Failed to persist coaching session");
            self.health
                .mark_degraded(&rep.id, e.to_string(), self.clock.now_utc());
        }

        let signature = self.persona.generate(
            category::SIGNATURE,
            None,
            Mood::Neutral,
            &PhraseContext::for_rep(rep.name.clone()),
        );
        let script = DeliveryScript {
            session_id: session.id.clone(),
            rep: rep.clone(),
            severity: directive.severity,
            message: directive.message,
            suggestions: directive.suggestions,
            signature,
        };
        self.spawn_transport(script, route_for(directive.severity));

        match self.performance.apply_delta(&rep.id, directive.mode).await {
            Ok(score) => debug!(score, "Score after session"),
            Err(e) => {
                warn!(error = %e, "Failed to update score");
                self.health
                    .mark_degraded(&rep.id, e.to_string(), self.clock.now_utc());
            }
        }

        session
    }

    fn spawn_transport(&self, script: DeliveryScript, route: &'static [ChannelKind]) {
        let router = Arc::clone(&self.router);
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);

        let mut tasks = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            let report = router.route(&script, route).await;

            for attempt in &report.attempts {
                let receipt = DeliveryReceipt {
                    session_id: script.session_id.clone(),
                    channel: attempt.channel.as_str().to_string(),
                    status: if attempt.succeeded() {
                        ReceiptStatus::Sent
                    } else {
                        ReceiptStatus::Failed
                    },
                    error: attempt.error.clone(),
                    created_at: clock.now_utc(),
                };
                if let Err(e) = store.append_receipt(&receipt) {
                    warn!(session_id = %script.session_id, error = %e, "Failed to store delivery receipt");
                }
            }

            if report.delivered_via().is_none() {
                warn!(
                    rep_id = %script.rep.id,
                    session_id = %script.session_id,
                    "All channels failed"
                );
            }
        });
    }

    /// Deliveries still running
    pub fn in_flight(&self) -> usize {
        let mut tasks = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Wait for every in-flight delivery, including ones spawned while waiting
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = {
                let mut guard = self
                    .in_flight
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *guard)
            };
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Delivery task failed");
                }
            }
        }
    }
}
