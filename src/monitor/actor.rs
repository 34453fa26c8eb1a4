use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::schedule::{Checkpoint, ScheduledCheckpoint, next_checkpoint};
use super::triggers::{self, Trigger};
use super::{MonitorContext, MonitorInput};
use crate::constants::score;
use crate::persona::{Mood, PhraseContext};
use crate::types::{
    ActivityEvent, CoachError, CoachingDirective, DailyStats, EventKind, RepId, RepIdentity,
    Result,
};

/// Owner-side handle of a running monitor
pub struct MonitorHandle {
    rep_id: RepId,
    inbox: mpsc::Sender<MonitorInput>,
    shutdown: watch::Sender<bool>,
    actor: JoinHandle<()>,
    producers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("rep_id", &self.rep_id)
            .field("running", &self.is_running())
            .finish()
    }
}

impl MonitorHandle {
    pub fn rep_id(&self) -> &RepId {
        &self.rep_id
    }

    pub fn is_running(&self) -> bool {
        !self.actor.is_finished()
    }

    /// Inbox sender, for callers that must not hold a borrow of the handle
    /// across an await
    pub fn sender(&self) -> mpsc::Sender<MonitorInput> {
        self.inbox.clone()
    }

    /// Queue an input behind whatever the producers already sent
    pub async fn inject(&self, input: MonitorInput) -> Result<()> {
        self.inbox
            .send(input)
            .await
            .map_err(|_| CoachError::not_found(&self.rep_id))
    }

    /// Resolve once every input queued so far has been handled
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.inject(MonitorInput::Barrier(tx)).await?;
        rx.await.map_err(|_| CoachError::not_found(&self.rep_id))
    }

    /// Stop producers now; the actor exits after its current input
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        for producer in &self.producers {
            producer.abort();
        }
    }

    pub async fn stop_and_wait(self) {
        self.stop();
        if let Err(e) = self.actor.await
            && !e.is_cancelled()
        {
            warn!(rep_id = %self.rep_id, error = %e, "Monitor task failed");
        }
    }
}

/// Start the actor and both producers for one rep
pub fn spawn_monitor(
    rep: RepIdentity,
    events: mpsc::Receiver<ActivityEvent>,
    ctx: Arc<MonitorContext>,
) -> MonitorHandle {
    let (inbox_tx, inbox_rx) = mpsc::channel(ctx.settings.channel_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    ctx.health.register(&rep.id, ctx.clock.now_utc());

    let producers = vec![
        tokio::spawn(forward_events(events, inbox_tx.clone(), shutdown_rx.clone())),
        tokio::spawn(run_timer(
            Arc::clone(&ctx),
            inbox_tx.clone(),
            shutdown_rx.clone(),
        )),
    ];

    let rep_id = rep.id.clone();
    let actor = MonitorActor::new(rep, ctx);
    let actor = tokio::spawn(actor.run(inbox_rx, shutdown_rx));

    MonitorHandle {
        rep_id,
        inbox: inbox_tx,
        shutdown: shutdown_tx,
        actor,
        producers,
    }
}

async fn forward_events(
    mut events: mpsc::Receiver<ActivityEvent>,
    inbox: mpsc::Sender<MonitorInput>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        if inbox.send(MonitorInput::Event(event)).await.is_err() {
            break;
        }
    }
}

async fn run_timer(
    ctx: Arc<MonitorContext>,
    inbox: mpsc::Sender<MonitorInput>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = ctx.settings.poll_interval;
    let mut poll = tokio::time::interval_at(Instant::now() + period, period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let next = next_checkpoint(ctx.clock.now_local(), &ctx.settings.checkpoints);
        let wait = next.map(|scheduled| {
            (scheduled.at.with_timezone(&Utc) - ctx.clock.now_utc())
                .to_std()
                .unwrap_or_default()
        });
        let checkpoint = async move {
            match (next, wait) {
                (Some(scheduled), Some(wait)) => {
                    tokio::time::sleep(wait).await;
                    scheduled
                }
                _ => std::future::pending::<ScheduledCheckpoint>().await,
            }
        };

        let input = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = poll.tick() => MonitorInput::Poll,
            scheduled = checkpoint => MonitorInput::Checkpoint(scheduled.checkpoint, scheduled.date),
        };
        if inbox.send(input).await.is_err() {
            break;
        }
    }
}

struct MonitorActor {
    rep: RepIdentity,
    ctx: Arc<MonitorContext>,
    /// Keys of handled events, with the local day they arrived
    seen: HashMap<(String, EventKind), NaiveDate>,
    open_calls: HashMap<String, NaiveDate>,
    /// Call ends waiting for their start, with the time they were held
    pending_ends: HashMap<String, (ActivityEvent, DateTime<Utc>)>,
    fired: HashSet<(NaiveDate, Checkpoint)>,
    store_failures: u32,
}

impl MonitorActor {
    fn new(rep: RepIdentity, ctx: Arc<MonitorContext>) -> Self {
        Self {
            rep,
            ctx,
            seen: HashMap::new(),
            open_calls: HashMap::new(),
            pending_ends: HashMap::new(),
            fired: HashSet::new(),
            store_failures: 0,
        }
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<MonitorInput>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(rep_id = %self.rep.id, "Monitor started");
        loop {
            let input = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                input = inbox.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };
            if self.handle(input).await.is_break() {
                break;
            }
        }
        info!(rep_id = %self.rep.id, "Monitor stopped");
    }

    async fn handle(&mut self, input: MonitorInput) -> ControlFlow<()> {
        match input {
            MonitorInput::Event(event) => self.on_event(event).await,
            MonitorInput::Poll => self.on_poll().await,
            MonitorInput::Checkpoint(checkpoint, date) => {
                self.on_checkpoint(checkpoint, date).await
            }
            MonitorInput::Barrier(ack) => {
                let _ = ack.send(());
            }
        }

        if self.store_failures >= self.ctx.settings.max_store_failures {
            warn!(
                rep_id = %self.rep.id,
                failures = self.store_failures,
                "Store keeps failing, halting monitor"
            );
            self.ctx.health.mark_halted(
                &self.rep.id,
                format!("{} consecutive store failures", self.store_failures),
                self.ctx.clock.now_utc(),
            );
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    #[instrument(skip_all, fields(rep_id = %self.rep.id, call_id = %event.call_id, kind = %event.kind))]
    async fn on_event(&mut self, event: ActivityEvent) {
        if event.rep_id != self.rep.id {
            warn!(other = %event.rep_id, "Event routed to the wrong monitor");
            return;
        }
        let today = self.ctx.clock.today();
        if self.seen.insert(event.dedup_key(), today).is_some() {
            debug!("Dropping replayed event");
            return;
        }

        match event.kind {
            EventKind::CallStarted => {
                self.open_calls.insert(event.call_id.clone(), today);
                self.check_research(&event).await;
                if let Some((held, _)) = self.pending_ends.remove(&event.call_id) {
                    self.open_calls.remove(&held.call_id);
                    self.on_call_ended(held).await;
                }
            }
            EventKind::CallEnded => {
                if self.open_calls.remove(&event.call_id).is_some() {
                    self.on_call_ended(event).await;
                } else {
                    debug!("Holding call end until its start arrives");
                    let held_at = self.ctx.clock.now_utc();
                    self.pending_ends
                        .insert(event.call_id.clone(), (event, held_at));
                }
            }
        }
    }

    /// A failed lookup counts as no research. A call with no linked contact
    /// has nothing to look up and is not coached.
    async fn check_research(&mut self, event: &ActivityEvent) {
        let Some(contact) = event.contact_id.as_deref() else {
            return;
        };
        let since = event.created_at - self.ctx.settings.research_window;
        let researched = match self
            .ctx
            .store
            .has_research_since(&self.rep.id, contact, since)
        {
            Ok(found) => {
                self.store_ok();
                found
            }
            Err(e) => {
                self.store_failed(&e);
                false
            }
        };

        if !researched {
            let stats = self.stats().unwrap_or_default();
            self.fire(triggers::no_research(), &stats).await;
        }
    }

    async fn on_call_ended(&mut self, event: ActivityEvent) {
        let fired = triggers::evaluate_call_ended(&event, self.ctx.settings.long_call_mins);
        if !fired.is_empty() {
            let stats = self.stats().unwrap_or_default();
            for trigger in fired {
                self.fire(trigger, &stats).await;
            }
        }

        match self.ctx.performance.record_call_quality(&event) {
            Ok(quality) => {
                self.store_ok();
                debug!(call_id = %event.call_id, quality, "Call quality recorded");
            }
            Err(e) => self.store_failed(&e),
        }
        match self.ctx.performance.refresh_daily_metrics(&self.rep.id).await {
            Ok(_) => self.store_ok(),
            Err(e) => self.store_failed(&e),
        }
    }

    #[instrument(skip_all, fields(rep_id = %self.rep.id))]
    async fn on_poll(&mut self) {
        self.release_orphans().await;
        self.prune_stale();

        let Some(stats) = self.stats() else {
            return;
        };
        let now = self.ctx.clock.now_local();
        for trigger in triggers::evaluate_poll(now, &stats) {
            self.fire(trigger, &stats).await;
        }
    }

    async fn release_orphans(&mut self) {
        let now = self.ctx.clock.now_utc();
        let grace = self.ctx.settings.orphan_grace;
        let expired: Vec<String> = self
            .pending_ends
            .iter()
            .filter(|(_, (_, held_at))| now - *held_at >= grace)
            .map(|(call_id, _)| call_id.clone())
            .collect();

        for call_id in expired {
            if let Some((event, _)) = self.pending_ends.remove(&call_id) {
                warn!(call_id = %call_id, "Call start never arrived, processing call end anyway");
                self.on_call_ended(event).await;
            }
        }
    }

    /// Drop dedup keys and unfinished calls older than yesterday. The store
    /// still rejects replays of anything pruned here.
    fn prune_stale(&mut self) {
        let Some(yesterday) = self.ctx.clock.today().pred_opt() else {
            return;
        };
        self.seen.retain(|_, day| *day >= yesterday);
        self.open_calls.retain(|call_id, day| {
            if *day < yesterday {
                debug!(call_id = %call_id, "Call never ended, forgetting it");
                false
            } else {
                true
            }
        });
    }

    #[instrument(skip_all, fields(rep_id = %self.rep.id, checkpoint = %checkpoint))]
    async fn on_checkpoint(&mut self, checkpoint: Checkpoint, date: NaiveDate) {
        if !self.fired.insert((date, checkpoint)) {
            debug!("Checkpoint already fired today");
            return;
        }
        if let Some(yesterday) = date.pred_opt() {
            self.fired.retain(|(day, _)| *day >= yesterday);
        }

        let Some(stats) = self.stats() else {
            return;
        };
        if let Some(trigger) = triggers::evaluate_checkpoint(checkpoint, &stats) {
            self.fire(trigger, &stats).await;
        }
    }

    fn stats(&mut self) -> Option<DailyStats> {
        match self.ctx.performance.daily_stats(&self.rep.id) {
            Ok(stats) => {
                self.store_ok();
                Some(stats)
            }
            Err(e) => {
                self.store_failed(&e);
                None
            }
        }
    }

    async fn fire(&mut self, trigger: Trigger, stats: &DailyStats) {
        let directive = self.render(trigger, stats);
        info!(
            rep_id = %self.rep.id,
            mode = %directive.mode,
            severity = %directive.severity,
            trigger = directive.trigger.as_deref().unwrap_or(""),
            "Coaching triggered"
        );
        let session = self.ctx.dispatcher.deliver(&self.rep, directive).await;
        debug!(session_id = %session.id, "Session recorded");
    }

    fn render(&self, trigger: Trigger, stats: &DailyStats) -> CoachingDirective {
        let score = self
            .ctx
            .performance
            .current_score(&self.rep.id)
            .unwrap_or(score::INITIAL);
        let context = PhraseContext::for_rep(self.rep.name.clone())
            .with_counts(
                stats.calls_today,
                stats.opportunities_today,
                stats.closed_today,
            )
            .with_score(score);

        let mut message = self.ctx.persona.generate(
            trigger.category,
            trigger.subcategory,
            Mood::from_score(score),
            &context,
        );
        if let Some(detail) = &trigger.detail {
            message.push(' ');
            message.push_str(detail);
        }

        let directive = CoachingDirective::new(trigger.mode, trigger.severity, message)
            .with_suggestions(trigger.suggestions)
            .with_trigger(trigger.tag);
        if trigger.action_required {
            directive.requiring_action()
        } else {
            directive
        }
    }

    fn store_ok(&mut self) {
        self.store_failures = 0;
        self.ctx
            .health
            .mark_recovered(&self.rep.id, self.ctx.clock.now_utc());
    }

    fn store_failed(&mut self, error: &CoachError) {
        self.store_failures += 1;
        warn!(rep_id = %self.rep.id, error = %error, "Store operation failed");
        self.ctx
            .health
            .mark_degraded(&self.rep.id, error.to_string(), self.ctx.clock.now_utc());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock, SharedClock};
    use crate::delivery::testing::RecordingChannel;
    use crate::delivery::{ChannelKind, ChannelRouter, CircuitBreakerConfig, Dispatcher};
    use crate::health::{HealthBoard, RepStatus};
    use crate::monitor::MonitorSettings;
    use crate::performance::PerformanceModel;
    use crate::persona::PersonaGenerator;
    use crate::storage::{CoachStore, Database, SharedStore};
    use crate::types::{CallOutcome, CoachingMode, Severity};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        db: Arc<Database>,
        clock: Arc<ManualClock>,
        ctx: Arc<MonitorContext>,
        sms: Arc<RecordingChannel>,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Arc::new(Database::open_in_memory().unwrap());
            db.initialize().unwrap();
            Self::with_store(db.clone(), db)
        }

        fn with_store(db: Arc<Database>, store: SharedStore) -> Self {
            // Friday 2025-03-14, 11:00 UTC
            let clock = Arc::new(ManualClock::at_utc(
                Utc.with_ymd_and_hms(2025, 3, 14, 11, 0, 0).unwrap(),
            ));
            let shared_clock: SharedClock = clock.clone();
            let sms = RecordingChannel::ok(ChannelKind::Sms);
            let router = ChannelRouter::new(CircuitBreakerConfig::default())
                .with_channel(sms.clone())
                .with_channel(RecordingChannel::ok(ChannelKind::Voice))
                .with_channel(RecordingChannel::ok(ChannelKind::InApp));
            let health = Arc::new(HealthBoard::new());
            let persona = Arc::new(PersonaGenerator::seeded(3));
            let performance = Arc::new(PerformanceModel::new(store.clone(), shared_clock.clone()));
            let dispatcher = Arc::new(Dispatcher::new(
                store.clone(),
                Arc::new(router),
                performance.clone(),
                persona.clone(),
                health.clone(),
                shared_clock.clone(),
            ));
            let ctx = Arc::new(MonitorContext {
                store,
                performance,
                dispatcher,
                persona,
                health,
                clock: shared_clock,
                settings: MonitorSettings::default(),
            });
            Self {
                db,
                clock,
                ctx,
                sms,
            }
        }

        fn spawn(&self) -> (mpsc::Sender<ActivityEvent>, MonitorHandle) {
            let (tx, rx) = mpsc::channel(16);
            let handle = spawn_monitor(RepIdentity::new("r1", "Dana"), rx, self.ctx.clone());
            (tx, handle)
        }

        fn sessions(&self) -> Vec<crate::types::CoachingSession> {
            self.db.sessions_for_rep(&RepId::new("r1"), 50).unwrap()
        }

        /// Record the event like the bus would, then hand it to the monitor
        async fn send(&self, handle: &MonitorHandle, event: ActivityEvent) {
            self.db.record_event(&event).unwrap();
            handle.inject(MonitorInput::Event(event)).await.unwrap();
            handle.flush().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_checkpoint_fires_once_per_day() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let today = f.clock.today();

        for _ in 0..2 {
            handle
                .inject(MonitorInput::Checkpoint(Checkpoint::FridayMotivation, today))
                .await
                .unwrap();
        }
        handle.flush().await.unwrap();

        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].mode, CoachingMode::MorningMotivator);
        assert_eq!(sessions[0].severity, Severity::Medium);
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_morning_checkpoint_mentions_call_count() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let now = f.clock.now_utc();
        for i in 0..3 {
            f.db.record_event(&ActivityEvent::call_started("r1", format!("c{}", i), None, now))
                .unwrap();
        }

        handle
            .inject(MonitorInput::Checkpoint(Checkpoint::Morning, f.clock.today()))
            .await
            .unwrap();
        handle.flush().await.unwrap();

        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].severity, Severity::High);
        assert!(sessions[0].message.contains('3'), "{}", sessions[0].message);
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_replayed_call_end_is_dropped() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let now = f.clock.now_utc();

        f.send(&handle, ActivityEvent::call_started("r1", "c1", None, now))
            .await;
        let ended = ActivityEvent::call_ended("r1", "c1", CallOutcome::Successful, 240, now);
        f.send(&handle, ended.clone()).await;
        handle.inject(MonitorInput::Event(ended)).await.unwrap();
        handle.flush().await.unwrap();

        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].mode, CoachingMode::Closer);
        // Optimal length and a close, but no notes
        assert_eq!(f.db.call_quality("c1").unwrap(), Some(90));
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_call_end_waits_for_start() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let now = f.clock.now_utc();

        f.send(
            &handle,
            ActivityEvent::call_ended("r1", "c9", CallOutcome::Successful, 240, now),
        )
        .await;
        assert!(f.sessions().is_empty());

        f.send(&handle, ActivityEvent::call_started("r1", "c9", None, now))
            .await;
        assert_eq!(f.sessions().len(), 1);
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_orphan_end_released_after_grace() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let now = f.clock.now_utc();
        // Past the 14:00 cutoff with enough calls, so the poll itself stays quiet
        f.clock.set(Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap());
        for i in 0..10 {
            f.db.record_event(&ActivityEvent::call_started("r1", format!("x{}", i), None, f.clock.now_utc()))
                .unwrap();
        }

        f.send(
            &handle,
            ActivityEvent::call_ended("r1", "c9", CallOutcome::Successful, 240, now),
        )
        .await;
        handle.inject(MonitorInput::Poll).await.unwrap();
        handle.flush().await.unwrap();
        assert!(f.sessions().is_empty());

        f.clock.advance(Duration::minutes(6));
        handle.inject(MonitorInput::Poll).await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(f.sessions().len(), 1);
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_no_research_fires_on_call_start() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        let now = f.clock.now_utc();
        let rep = RepId::new("r1");

        f.send(&handle, ActivityEvent::call_started("r1", "c0", None, now))
            .await;
        assert!(f.sessions().is_empty(), "no contact, nothing to look up");

        f.db.record_research(&rep, "acme", now - Duration::minutes(10))
            .unwrap();
        f.send(
            &handle,
            ActivityEvent::call_started("r1", "c1", Some("acme".into()), now),
        )
        .await;
        assert!(f.sessions().is_empty());

        f.send(
            &handle,
            ActivityEvent::call_started("r1", "c2", Some("globex".into()), now),
        )
        .await;
        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].trigger.as_deref(), Some("no_research"));
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_poll_stalled_pipeline_goes_immediate() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();
        f.clock.set(Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap());
        let now = f.clock.now_utc();
        for i in 0..12 {
            f.db.record_event(&ActivityEvent::call_started("r1", format!("c{}", i), None, now))
                .unwrap();
        }
        for i in 0..6 {
            f.db.record_event(&ActivityEvent::call_ended(
                "r1",
                format!("c{}", i),
                CallOutcome::FollowUpRequired,
                120,
                now,
            ))
            .unwrap();
        }

        handle.inject(MonitorInput::Poll).await.unwrap();
        handle.flush().await.unwrap();
        f.ctx.dispatcher.wait_idle().await;

        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].severity, Severity::Immediate);
        assert_eq!(f.sms.count(), 0, "voice handles immediate first");
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_stop_rejects_new_input() {
        let f = Fixture::new();
        let (tx, handle) = f.spawn();
        handle.stop();
        handle.flush().await.ok();

        tokio::task::yield_now().await;
        let _ = tx
            .send(ActivityEvent::call_started("r1", "late", None, f.clock.now_utc()))
            .await;
        handle.stop_and_wait().await;
        assert!(f.sessions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_feeds_polls() {
        let f = Fixture::new();
        let (_tx, handle) = f.spawn();

        // Before the 14:00 cutoff with no calls: every poll fires slow start
        tokio::time::sleep(std::time::Duration::from_secs(30 * 60 + 1)).await;
        handle.flush().await.unwrap();

        let sessions = f.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].trigger.as_deref(), Some("low_call_volume"));
        handle.stop_and_wait().await;
    }

    #[tokio::test]
    async fn test_poll_forgets_state_from_before_yesterday() {
        let f = Fixture::new();
        let mut actor = MonitorActor::new(RepIdentity::new("r1", "Dana"), f.ctx.clone());
        let now = f.clock.now_utc();
        let _ = actor
            .handle(MonitorInput::Event(ActivityEvent::call_started("r1", "c1", None, now)))
            .await;
        let _ = actor.handle(MonitorInput::Poll).await;
        assert_eq!(actor.seen.len(), 1);
        assert_eq!(actor.open_calls.len(), 1);

        f.clock.advance(Duration::days(1));
        let _ = actor.handle(MonitorInput::Poll).await;
        assert_eq!(actor.open_calls.len(), 1, "yesterday's calls are kept");

        f.clock.advance(Duration::days(1));
        let _ = actor.handle(MonitorInput::Poll).await;
        assert!(actor.seen.is_empty());
        assert!(actor.open_calls.is_empty());
        f.ctx.dispatcher.wait_idle().await;
    }

    #[test]
    fn test_render_appends_detail() {
        let f = Fixture::new();
        let actor = MonitorActor::new(RepIdentity::new("r1", "Dana"), f.ctx.clone());
        let event = ActivityEvent::call_ended("r1", "c1", CallOutcome::Unsuccessful, 60, Utc::now())
            .with_transcript("Sorry to bother you.");
        let trigger = triggers::evaluate_call_ended(&event, 10).remove(0);
        let directive = actor.render(trigger, &DailyStats::default());

        assert!(directive.message.ends_with("earning attention."));
        assert!(directive.action_required);
        assert!(!directive.suggestions.is_empty());
    }

    struct BrokenStore;

    impl CoachStore for BrokenStore {
        fn ping(&self) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn upsert_reps(&self, _: &[RepIdentity]) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn set_rep_active(&self, _: &RepId, _: bool) -> Result<bool> {
            Err(CoachError::Storage("down".into()))
        }
        fn list_reps(&self, _: bool) -> Result<Vec<RepIdentity>> {
            Err(CoachError::Storage("down".into()))
        }
        fn record_event(&self, _: &ActivityEvent) -> Result<bool> {
            Err(CoachError::Storage("down".into()))
        }
        fn events_between(
            &self,
            _: &RepId,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> Result<Vec<ActivityEvent>> {
            Err(CoachError::Storage("down".into()))
        }
        fn record_research(&self, _: &RepId, _: &str, _: DateTime<Utc>) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn has_research_since(&self, _: &RepId, _: &str, _: DateTime<Utc>) -> Result<bool> {
            Err(CoachError::Storage("down".into()))
        }
        fn append_session(&self, _: &crate::types::CoachingSession) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn sessions_for_rep(&self, _: &RepId, _: usize) -> Result<Vec<crate::types::CoachingSession>> {
            Err(CoachError::Storage("down".into()))
        }
        fn append_receipt(&self, _: &crate::types::DeliveryReceipt) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn receipts_for_session(&self, _: &str) -> Result<Vec<crate::types::DeliveryReceipt>> {
            Err(CoachError::Storage("down".into()))
        }
        fn push_notification(&self, _: &crate::types::InAppNotification) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn notifications_for_rep(&self, _: &RepId) -> Result<Vec<crate::types::InAppNotification>> {
            Err(CoachError::Storage("down".into()))
        }
        fn metrics_for_day(
            &self,
            _: &RepId,
            _: NaiveDate,
        ) -> Result<Option<crate::types::MetricsSnapshot>> {
            Err(CoachError::Storage("down".into()))
        }
        fn latest_metrics(&self, _: &RepId) -> Result<Option<crate::types::MetricsSnapshot>> {
            Err(CoachError::Storage("down".into()))
        }
        fn upsert_metrics(&self, _: &crate::types::MetricsSnapshot) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn latest_scores(&self) -> Result<Vec<(RepId, u8)>> {
            Err(CoachError::Storage("down".into()))
        }
        fn record_call_quality(&self, _: &RepId, _: &str, _: u8, _: DateTime<Utc>) -> Result<()> {
            Err(CoachError::Storage("down".into()))
        }
        fn call_quality(&self, _: &str) -> Result<Option<u8>> {
            Err(CoachError::Storage("down".into()))
        }
    }

    #[tokio::test]
    async fn test_store_outage_degrades_then_halts() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let f = Fixture::with_store(db, Arc::new(BrokenStore));
        let (_tx, handle) = f.spawn();
        let rep = RepId::new("r1");

        handle.inject(MonitorInput::Poll).await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(f.ctx.health.status(&rep), RepStatus::Degraded);

        for _ in 0..MonitorSettings::default().max_store_failures {
            if handle.inject(MonitorInput::Poll).await.is_err() {
                break;
            }
        }
        // Fails once the actor has halted and dropped its inbox
        handle.flush().await.ok();
        assert!(!handle.is_running() || handle.flush().await.is_err());
        handle.stop_and_wait().await;
        assert_eq!(f.ctx.health.status(&rep), RepStatus::Halted);
    }
}
