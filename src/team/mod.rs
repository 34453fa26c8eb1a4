//! Team Orchestrator
//!
//! Registry of monitored reps and the programmatic surface external callers
//! use. A rep is either fully monitored (subscription, actor and producers
//! running) or absent from the registry.

mod report;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

pub use report::{CallReview, Challenge, LeaderboardEntry, RepStats, TeamHealth, UnhealthyRep};

use crate::constants::{monitor as limits, score};
use crate::delivery::Dispatcher;
use crate::monitor::{
    ActivityBus, Checkpoint, MonitorContext, MonitorHandle, MonitorInput, spawn_monitor,
};
use crate::persona::{Mood, PhraseContext, category};
use crate::types::{
    ActivityEvent, CoachError, CoachingDirective, CoachingMode, CoachingSession, RepId,
    RepIdentity, Result, Severity,
};

struct RepEntry {
    identity: RepIdentity,
    handle: MonitorHandle,
}

struct ChallengeTemplate {
    title: &'static str,
    goal: &'static str,
    target: u32,
    hours: i64,
}

const CHALLENGES: &[ChallengeTemplate] = &[
    ChallengeTemplate {
        title: "Power Hour",
        goal: "Most dials in the next hour",
        target: 20,
        hours: 1,
    },
    ChallengeTemplate {
        title: "Pipeline Builder",
        goal: "Book follow-up meetings before end of day",
        target: 5,
        hours: 8,
    },
    ChallengeTemplate {
        title: "Closer's Club",
        goal: "Close deals before the week is out",
        target: 3,
        hours: 72,
    },
    ChallengeTemplate {
        title: "Research Sprint",
        goal: "Research every contact before you dial them today",
        target: 15,
        hours: 8,
    },
];

pub struct TeamOrchestrator {
    ctx: Arc<MonitorContext>,
    bus: Arc<ActivityBus>,
    registry: DashMap<RepId, RepEntry>,
}

impl TeamOrchestrator {
    pub fn new(ctx: MonitorContext, bus: Arc<ActivityBus>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            bus,
            registry: DashMap::new(),
        }
    }

    pub fn bus(&self) -> &Arc<ActivityBus> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.ctx.dispatcher
    }

    pub fn is_monitored(&self, rep_id: &RepId) -> bool {
        self.registry.contains_key(rep_id)
    }

    /// Monitored reps, sorted by id
    pub fn monitored(&self) -> Vec<RepIdentity> {
        let mut reps: Vec<_> = self
            .registry
            .iter()
            .map(|entry| entry.identity.clone())
            .collect();
        reps.sort_by(|a, b| a.id.cmp(&b.id));
        reps
    }

    /// Record an activity event and route it to the rep's monitor
    pub async fn publish(&self, event: ActivityEvent) -> Result<()> {
        self.bus.publish(event).await
    }

    /// Resolve once the rep's monitor has handled everything queued so far
    pub async fn flush(&self, rep_id: &RepId) -> Result<()> {
        self.send_with_barrier(rep_id, None).await
    }

    /// Evaluate a checkpoint for today right away, outside the schedule.
    /// Each checkpoint still fires at most once per day.
    pub async fn run_checkpoint(&self, rep_id: &RepId, checkpoint: Checkpoint) -> Result<()> {
        let today = self.ctx.clock.today();
        self.send_with_barrier(rep_id, Some(MonitorInput::Checkpoint(checkpoint, today)))
            .await
    }

    async fn send_with_barrier(&self, rep_id: &RepId, input: Option<MonitorInput>) -> Result<()> {
        // Clone the sender so no registry guard lives across an await
        let inbox = self
            .registry
            .get(rep_id)
            .map(|entry| entry.handle.sender())
            .ok_or_else(|| CoachError::not_found(rep_id))?;
        let gone = || CoachError::not_found(rep_id);

        if let Some(input) = input {
            inbox.send(input).await.map_err(|_| gone())?;
        }
        let (tx, rx) = oneshot::channel();
        inbox
            .send(MonitorInput::Barrier(tx))
            .await
            .map_err(|_| gone())?;
        rx.await.map_err(|_| gone())
    }

    /// Register and start monitoring every rep in the roster
    pub async fn initialize_team(&self, reps: Vec<RepIdentity>) -> Result<Vec<RepIdentity>> {
        let mut added = Vec::with_capacity(reps.len());
        for rep in reps {
            added.push(self.add_rep(rep).await?);
        }
        info!(count = added.len(), "Team initialized");
        Ok(added)
    }

    /// Start monitoring a rep. Already-monitored reps are left untouched.
    #[instrument(skip_all, fields(rep_id = %rep.id))]
    pub async fn add_rep(&self, rep: RepIdentity) -> Result<RepIdentity> {
        if rep.id.as_str().trim().is_empty() {
            return Err(CoachError::InvalidInput("rep id must not be empty".into()));
        }

        match self.registry.entry(rep.id.clone()) {
            Entry::Occupied(existing) => return Ok(existing.get().identity.clone()),
            Entry::Vacant(slot) => {
                let events = self.bus.subscribe(&rep.id);
                let handle = spawn_monitor(rep.clone(), events, Arc::clone(&self.ctx));
                slot.insert(RepEntry {
                    identity: rep.clone(),
                    handle,
                });
            }
        }

        if let Err(e) = self
            .ctx
            .store
            .upsert_reps(std::slice::from_ref(&rep))
            .and_then(|_| self.ctx.store.set_rep_active(&rep.id, true))
        {
            warn!(error = %e, "Failed to persist rep");
        }
        info!(name = %rep.name, "Rep added");
        Ok(rep)
    }

    /// Stop monitoring a rep. Sessions and metrics stay in the store and
    /// deliveries already in flight complete.
    #[instrument(skip(self), fields(rep_id = %rep_id))]
    pub async fn remove_rep(&self, rep_id: &RepId) -> Result<()> {
        let (_, entry) = self
            .registry
            .remove(rep_id)
            .ok_or_else(|| CoachError::not_found(rep_id))?;

        self.bus.unsubscribe(rep_id);
        entry.handle.stop_and_wait().await;
        self.ctx.health.remove(rep_id);
        self.ctx.performance.forget(rep_id);

        if let Err(e) = self.ctx.store.set_rep_active(rep_id, false) {
            warn!(error = %e, "Failed to mark rep inactive");
        }
        info!("Rep removed");
        Ok(())
    }

    fn identity(&self, rep_id: &RepId) -> Result<RepIdentity> {
        self.registry
            .get(rep_id)
            .map(|entry| entry.identity.clone())
            .ok_or_else(|| CoachError::not_found(rep_id))
    }

    /// Deliver a manual directive. The reason picks the coaching mode.
    #[instrument(skip(self), fields(rep_id = %rep_id))]
    pub async fn intervene(
        &self,
        rep_id: &RepId,
        reason: &str,
        severity: Severity,
    ) -> Result<CoachingSession> {
        let rep = self.identity(rep_id)?;
        let mode = classify_reason(reason);

        let stats = self.ctx.performance.daily_stats(rep_id).unwrap_or_else(|e| {
            warn!(error = %e, "Stats unavailable for intervention");
            Default::default()
        });
        let current = self
            .ctx
            .performance
            .current_score(rep_id)
            .unwrap_or(score::INITIAL);
        let context = PhraseContext::for_rep(rep.name.clone())
            .with_counts(
                stats.calls_today,
                stats.opportunities_today,
                stats.closed_today,
            )
            .with_score(current);
        let message = self.ctx.persona.generate(
            category_for(mode),
            None,
            Mood::from_score(current),
            &context,
        );

        let directive = CoachingDirective::new(mode, severity, message)
            .with_trigger(format!("manual: {}", reason.trim()))
            .requiring_action();
        Ok(self.ctx.dispatcher.deliver(&rep, directive).await)
    }

    pub async fn get_rep_stats(&self, rep_id: &RepId) -> Result<RepStats> {
        let rep = self.identity(rep_id)?;
        let score = self.ctx.performance.current_score(rep_id)?;
        Ok(RepStats {
            today: self.ctx.performance.daily_stats(rep_id)?,
            recent_sessions: self
                .ctx
                .store
                .sessions_for_rep(rep_id, limits::RECENT_SESSIONS)?,
            status: self.ctx.health.status(rep_id),
            mood: Mood::from_score(score),
            score,
            rep,
        })
    }

    /// Scores descending, ties by rep id. Monitored reps without a stored
    /// score appear with the initial score.
    pub async fn get_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let mut scores: HashMap<RepId, u8> = self.ctx.store.latest_scores()?.into_iter().collect();
        for entry in self.registry.iter() {
            scores.entry(entry.key().clone()).or_insert(score::INITIAL);
        }

        let mut ranked: Vec<(RepId, u8)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let last = ranked.len().saturating_sub(1);
        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(idx, (rep_id, score))| {
                let place = if idx == 0 {
                    Some("first")
                } else if idx == last {
                    Some("last")
                } else {
                    None
                };
                let name = self
                    .registry
                    .get(&rep_id)
                    .map(|entry| entry.identity.name.clone())
                    .unwrap_or_else(|| rep_id.to_string());
                let commentary = self.ctx.persona.generate(
                    category::LEADERBOARD,
                    place,
                    Mood::from_score(score),
                    &PhraseContext::for_rep(name).with_score(score),
                );
                LeaderboardEntry {
                    rep_id,
                    score,
                    rank: idx + 1,
                    commentary,
                }
            })
            .collect())
    }

    pub async fn create_challenge(&self) -> Challenge {
        // CHALLENGES is a non-empty const
        let template = self.ctx.persona.choose(CHALLENGES).unwrap_or(&CHALLENGES[0]);
        let pitch = self.ctx.persona.generate(
            category::CHALLENGE,
            None,
            Mood::Neutral,
            &PhraseContext::default(),
        );
        Challenge {
            id: uuid::Uuid::new_v4().to_string(),
            title: template.title.to_string(),
            goal: template.goal.to_string(),
            target: template.target,
            ends_at: self.ctx.clock.now_utc() + chrono::Duration::hours(template.hours),
            pitch,
        }
    }

    pub async fn analyze_call(&self, transcript: &str) -> CallReview {
        CallReview::of(transcript)
    }

    pub async fn get_wisdom(&self, mood: Option<Mood>) -> String {
        self.ctx.persona.generate(
            category::WISDOM,
            None,
            mood.unwrap_or(Mood::Neutral),
            &PhraseContext::default(),
        )
    }

    pub async fn health_check(&self) -> TeamHealth {
        TeamHealth {
            monitored: self.registry.len(),
            unhealthy: self
                .ctx
                .health
                .unhealthy()
                .into_iter()
                .map(|(rep_id, health)| UnhealthyRep { rep_id, health })
                .collect(),
            store_ok: self.ctx.store.ping().is_ok(),
            circuits: self.ctx.dispatcher.router().circuit_stats(),
            deliveries_in_flight: self.ctx.dispatcher.in_flight(),
        }
    }

    /// Stop every monitor, then wait for in-flight deliveries
    pub async fn shutdown(&self) {
        let rep_ids: Vec<RepId> = self.registry.iter().map(|e| e.key().clone()).collect();
        for rep_id in rep_ids {
            if let Some((_, entry)) = self.registry.remove(&rep_id) {
                self.bus.unsubscribe(&rep_id);
                entry.handle.stop_and_wait().await;
            }
        }
        self.ctx.dispatcher.wait_idle().await;
        info!("Team orchestrator stopped");
    }
}

/// Keyword classification of a manual intervention reason
pub fn classify_reason(reason: &str) -> CoachingMode {
    let reason = reason.to_lowercase();
    if reason.contains("morning") || reason.contains("slow start") {
        CoachingMode::MorningMotivator
    } else if reason.contains("close") || reason.contains("deal") {
        CoachingMode::Closer
    } else {
        CoachingMode::PostCallCritic
    }
}

fn category_for(mode: CoachingMode) -> &'static str {
    match mode {
        CoachingMode::MorningMotivator => category::MORNING,
        CoachingMode::Closer => category::CLOSER,
        CoachingMode::PerformanceReviewer => category::SLOW_START,
        CoachingMode::PostCallCritic => category::POST_CALL,
        CoachingMode::LiveDemoMaster => category::FRIDAY,
    }
}
