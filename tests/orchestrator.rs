//! End-to-end coaching flows through the public orchestrator API against an
//! in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use repcoach::delivery::{
    ChannelKind, ChannelRouter, CircuitBreakerConfig, DeliveryChannel, DeliveryScript, Dispatcher,
};
use repcoach::health::HealthBoard;
use repcoach::monitor::{ActivityBus, Checkpoint, MonitorContext, MonitorSettings};
use repcoach::performance::PerformanceModel;
use repcoach::persona::PersonaGenerator;
use repcoach::storage::{CoachStore, Database, SharedStore};
use repcoach::team::TeamOrchestrator;
use repcoach::types::{
    ActivityEvent, CallOutcome, CoachError, CoachingMode, DeliveryOutcome, MetricsSnapshot,
    RepId, RepIdentity, Result, Severity,
};
use repcoach::{Clock, ManualClock, SharedClock};

struct Recorder {
    kind: ChannelKind,
    fail: bool,
    delivered: Mutex<Vec<DeliveryScript>>,
}

impl Recorder {
    fn new(kind: ChannelKind, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail,
            delivered: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryChannel for Recorder {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(&self, script: &DeliveryScript) -> Result<()> {
        self.delivered.lock().unwrap().push(script.clone());
        if self.fail {
            Err(CoachError::delivery(self.kind.as_str(), "connection refused"))
        } else {
            Ok(())
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }
}

struct Harness {
    team: TeamOrchestrator,
    store: SharedStore,
    clock: Arc<ManualClock>,
    voice: Arc<Recorder>,
    sms: Arc<Recorder>,
}

impl Harness {
    fn new(voice_fails: bool) -> Self {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let store: SharedStore = Arc::new(db);

        // Friday 2025-03-14 10:05 UTC, after the morning checkpoint time
        let clock = Arc::new(ManualClock::at_utc(
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 5, 0).unwrap(),
        ));
        let shared_clock: SharedClock = clock.clone();

        let voice = Recorder::new(ChannelKind::Voice, voice_fails);
        let sms = Recorder::new(ChannelKind::Sms, false);
        let in_app = Recorder::new(ChannelKind::InApp, false);
        let router = Arc::new(
            ChannelRouter::new(CircuitBreakerConfig::default())
                .with_channel(voice.clone())
                .with_channel(sms.clone())
                .with_channel(in_app),
        );

        let performance = Arc::new(PerformanceModel::new(store.clone(), shared_clock.clone()));
        let persona = Arc::new(PersonaGenerator::seeded(11));
        let health = Arc::new(HealthBoard::new());
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            router,
            performance.clone(),
            persona.clone(),
            health.clone(),
            shared_clock.clone(),
        ));
        let ctx = MonitorContext {
            store: store.clone(),
            performance,
            dispatcher,
            persona,
            health,
            clock: shared_clock,
            settings: MonitorSettings::default(),
        };
        let bus = Arc::new(ActivityBus::new(store.clone(), 64));

        Self {
            team: TeamOrchestrator::new(ctx, bus),
            store,
            clock,
            voice,
            sms,
        }
    }

    fn at(&self, hour: u32, min: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, min, 0).unwrap()
    }

    /// Let the bus forwarder hand events to the actor, then wait for the actor
    async fn settle(&self, rep_id: &RepId) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        self.team.flush(rep_id).await.unwrap();
    }

    fn record_calls(&self, rep_id: &str, count: usize) {
        for i in 0..count {
            let event = ActivityEvent::call_started(
                rep_id,
                format!("{}-call-{}", rep_id, i),
                None,
                self.at(9, i as u32),
            );
            assert!(self.store.record_event(&event).unwrap());
        }
    }

    fn sessions(&self, rep_id: &RepId) -> Vec<repcoach::CoachingSession> {
        self.store.sessions_for_rep(rep_id, 50).unwrap()
    }
}

#[tokio::test]
async fn replayed_call_end_creates_one_session() {
    let h = Harness::new(false);
    let rep = RepIdentity::new("dana", "Dana");
    h.team.add_rep(rep.clone()).await.unwrap();

    let start = ActivityEvent::call_started("dana", "c1", None, h.at(10, 0));
    let end = ActivityEvent::call_ended("dana", "c1", CallOutcome::Unsuccessful, 120, h.at(10, 2));
    h.team.publish(start).await.unwrap();
    h.team.publish(end.clone()).await.unwrap();
    h.team.publish(end).await.unwrap();
    h.settle(&rep.id).await;

    let sessions = h.sessions(&rep.id);
    assert_eq!(sessions.len(), 1, "sessions: {:?}", sessions);
    assert_eq!(sessions[0].mode, CoachingMode::PostCallCritic);
    assert_eq!(sessions[0].severity, Severity::High);
    assert_eq!(
        sessions[0].trigger.as_deref(),
        Some("call_outcome:unsuccessful")
    );

    h.team.dispatcher().wait_idle().await;
    assert_eq!(h.sms.count(), 1);
    h.team.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn call_end_replayed_after_readd_is_not_coached_again() {
    let h = Harness::new(false);
    let rep = RepIdentity::new("gus", "Gus");
    h.team.add_rep(rep.clone()).await.unwrap();

    let end = ActivityEvent::call_ended("gus", "c7", CallOutcome::Unsuccessful, 120, h.at(10, 2));
    h.team
        .publish(ActivityEvent::call_started("gus", "c7", None, h.at(10, 0)))
        .await
        .unwrap();
    h.team.publish(end.clone()).await.unwrap();
    h.settle(&rep.id).await;

    h.team.remove_rep(&rep.id).await.unwrap();
    h.team.add_rep(rep.clone()).await.unwrap();
    h.team.publish(end).await.unwrap();
    h.settle(&rep.id).await;

    // Past the orphan grace period, then let the poll timer tick
    h.clock.advance(chrono::Duration::minutes(6));
    tokio::time::sleep(std::time::Duration::from_secs(31 * 60)).await;
    h.settle(&rep.id).await;

    let critiques = h
        .sessions(&rep.id)
        .iter()
        .filter(|s| s.trigger.as_deref() == Some("call_outcome:unsuccessful"))
        .count();
    assert_eq!(critiques, 1);
    h.team.shutdown().await;
}

#[tokio::test]
async fn removing_a_rep_keeps_history() {
    let h = Harness::new(false);
    let rep = RepIdentity::new("eli", "Eli");
    h.team.add_rep(rep.clone()).await.unwrap();

    let session = h
        .team
        .intervene(&rep.id, "closed a big deal", Severity::Medium)
        .await
        .unwrap();
    assert_eq!(session.mode, CoachingMode::Closer);

    h.team.remove_rep(&rep.id).await.unwrap();
    assert!(!h.team.is_monitored(&rep.id));
    assert_eq!(h.sessions(&rep.id).len(), 1);

    let err = h
        .team
        .run_checkpoint(&rep.id, Checkpoint::EndOfDay)
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::NotFound(_)));
    assert!(matches!(
        h.team.remove_rep(&rep.id).await,
        Err(CoachError::NotFound(_))
    ));
    assert_eq!(h.store.list_reps(true).unwrap().len(), 0);
    h.team.shutdown().await;
}

#[tokio::test]
async fn morning_checkpoint_depends_on_call_volume() {
    let h = Harness::new(false);
    h.record_calls("slow", 3);
    h.record_calls("busy", 12);

    let slow = RepIdentity::new("slow", "Sam");
    let busy = RepIdentity::new("busy", "Bea");
    h.team
        .initialize_team(vec![slow.clone(), busy.clone()])
        .await
        .unwrap();

    h.team
        .run_checkpoint(&slow.id, Checkpoint::Morning)
        .await
        .unwrap();
    h.team
        .run_checkpoint(&busy.id, Checkpoint::Morning)
        .await
        .unwrap();

    let sessions = h.sessions(&slow.id);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].mode, CoachingMode::MorningMotivator);
    assert_eq!(sessions[0].severity, Severity::High);
    assert!(sessions[0].message.contains('3'), "{}", sessions[0].message);
    assert!(h.sessions(&busy.id).is_empty());

    // Once per day
    h.team
        .run_checkpoint(&slow.id, Checkpoint::Morning)
        .await
        .unwrap();
    assert_eq!(h.sessions(&slow.id).len(), 1);
    h.team.shutdown().await;
}

#[tokio::test]
async fn leaderboard_ranks_by_score() {
    let h = Harness::new(false);
    let today = h.clock.today();
    for (id, name, score) in [("a", "Ann", 70u8), ("b", "Ben", 90), ("c", "Cy", 40)] {
        h.team.add_rep(RepIdentity::new(id, name)).await.unwrap();
        h.store
            .upsert_metrics(&MetricsSnapshot::fresh(&RepId::new(id), today, score))
            .unwrap();
    }

    let board = h.team.get_leaderboard().await.unwrap();
    let ranked: Vec<(&str, u8, usize)> = board
        .iter()
        .map(|e| (e.rep_id.as_str(), e.score, e.rank))
        .collect();
    assert_eq!(ranked, vec![("b", 90, 1), ("a", 70, 2), ("c", 40, 3)]);
    assert_eq!(board[0].commentary, "Top of the board, Ben. Now defend it.");
    assert!(board[2].commentary.starts_with("Last place, Cy."));
    assert_eq!(board[1].commentary, "You're in the race, Ann. Now win it.");
    h.team.shutdown().await;
}

#[tokio::test]
async fn immediate_directive_falls_back_from_voice_to_sms() {
    let h = Harness::new(true);
    let rep = RepIdentity::new("fay", "Fay").with_phone("+15550001");
    h.team.add_rep(rep.clone()).await.unwrap();

    let session = h
        .team
        .intervene(&rep.id, "pipeline is dry", Severity::Immediate)
        .await
        .unwrap();
    h.team.dispatcher().wait_idle().await;

    assert_eq!(h.voice.count(), 1);
    assert_eq!(h.sms.count(), 1);

    let receipts = h.store.receipts_for_session(&session.id).unwrap();
    let channels: Vec<&str> = receipts.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["voice", "sms"]);
    assert_eq!(
        h.store.session_outcome(&session.id).unwrap(),
        DeliveryOutcome::Delivered
    );

    let health = h.team.health_check().await;
    assert!(health.is_healthy());
    assert_eq!(health.monitored, 1);
    h.team.shutdown().await;
}
