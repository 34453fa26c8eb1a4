//! Performance Model
//!
//! Bounded 0–100 score per rep plus daily activity aggregates.
//!
//! ## Scoring
//!
//! - Coaching deltas: `post_call_critic` −5, `closer` +10, others 0, clamped
//! - Today's row is keyed by (rep, local date). A day without a row starts
//!   from the rep's most recent score, or 50 for a new rep.
//!
//! ## Call quality
//!
//! ```text
//! quality = 0.3 * duration_optimality + 0.6 * outcome_score + 0.1 * notes_bonus
//! ```
//!
//! Writes for one rep serialize on a per-rep async lock; different reps
//! never contend.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::clock::SharedClock;
use crate::constants::{quality, score};
use crate::storage::SharedStore;
use crate::types::{
    ActivityEvent, CallOutcome, CoachingMode, DailyStats, EventKind, MetricsSnapshot, RepId,
    Result,
};

pub struct PerformanceModel {
    store: SharedStore,
    clock: SharedClock,
    locks: DashMap<RepId, Arc<Mutex<()>>>,
}

impl PerformanceModel {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, rep_id: &RepId) -> Arc<Mutex<()>> {
        self.locks
            .entry(rep_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Latest persisted snapshot, or the initial one for a rep never scored
    pub fn load(&self, rep_id: &RepId) -> Result<MetricsSnapshot> {
        Ok(self
            .store
            .latest_metrics(rep_id)?
            .unwrap_or_else(|| MetricsSnapshot::initial(rep_id, self.clock.today())))
    }

    pub fn current_score(&self, rep_id: &RepId) -> Result<u8> {
        Ok(self.load(rep_id)?.score)
    }

    /// Today's row, creating it from the latest score when missing
    fn today_snapshot(&self, rep_id: &RepId) -> Result<MetricsSnapshot> {
        let today = self.clock.today();
        if let Some(existing) = self.store.metrics_for_day(rep_id, today)? {
            return Ok(existing);
        }
        let carried = self
            .store
            .latest_metrics(rep_id)?
            .map(|m| m.score)
            .unwrap_or(score::INITIAL);
        Ok(MetricsSnapshot::fresh(rep_id, today, carried))
    }

    /// Apply a coaching mode's score delta and persist today's row
    pub async fn apply_delta(&self, rep_id: &RepId, mode: CoachingMode) -> Result<u8> {
        let lock = self.lock_for(rep_id);
        let _guard = lock.lock().await;

        let mut snapshot = self.today_snapshot(rep_id)?;
        let previous = snapshot.score;
        snapshot.score = adjusted_score(previous, mode.score_delta());
        self.store.upsert_metrics(&snapshot)?;

        tracing::debug!(
            rep_id = %rep_id,
            mode = %mode,
            previous,
            score = snapshot.score,
            "Score updated"
        );
        Ok(snapshot.score)
    }

    /// Aggregate today's (local) activity
    pub fn daily_stats(&self, rep_id: &RepId) -> Result<DailyStats> {
        let (start, end) = self.clock.day_bounds(self.clock.today());
        let events = self.store.events_between(rep_id, start, end)?;
        Ok(aggregate_daily(&events))
    }

    /// Write today's counters into the metrics row, keeping the stored score
    pub async fn refresh_daily_metrics(&self, rep_id: &RepId) -> Result<MetricsSnapshot> {
        let lock = self.lock_for(rep_id);
        let _guard = lock.lock().await;

        let stats = self.daily_stats(rep_id)?;
        let mut snapshot = self.today_snapshot(rep_id)?;
        snapshot.apply_stats(&stats);
        self.store.upsert_metrics(&snapshot)?;
        Ok(snapshot)
    }

    /// Score a finished call and persist it
    pub fn record_call_quality(&self, event: &ActivityEvent) -> Result<u8> {
        let quality = call_quality_score(event);
        self.store
            .record_call_quality(&event.rep_id, &event.call_id, quality, event.created_at)?;
        tracing::debug!(
            rep_id = %event.rep_id,
            call_id = %event.call_id,
            quality,
            "Call quality recorded"
        );
        Ok(quality)
    }

    /// Release the lock entry of a rep that is no longer monitored
    pub fn forget(&self, rep_id: &RepId) {
        self.locks.remove(rep_id);
    }
}

// =============================================================================
// Pure scoring
// =============================================================================

pub fn clamp_score(raw: i32) -> u8 {
    raw.clamp(i32::from(score::MIN), i32::from(score::MAX)) as u8
}

pub fn adjusted_score(current: u8, delta: i32) -> u8 {
    clamp_score(i32::from(current) + delta)
}

/// 100 inside the optimal window, linear to 0 at 0 minutes and at the zero-score length
pub fn duration_optimality(minutes: f64) -> f64 {
    if minutes <= 0.0 || minutes >= quality::ZERO_SCORE_MINUTES {
        0.0
    } else if minutes < quality::OPTIMAL_MIN_MINUTES {
        minutes / quality::OPTIMAL_MIN_MINUTES * 100.0
    } else if minutes <= quality::OPTIMAL_MAX_MINUTES {
        100.0
    } else {
        (quality::ZERO_SCORE_MINUTES - minutes)
            / (quality::ZERO_SCORE_MINUTES - quality::OPTIMAL_MAX_MINUTES)
            * 100.0
    }
}

pub fn outcome_score(outcome: CallOutcome) -> f64 {
    match outcome {
        CallOutcome::Successful => 100.0,
        CallOutcome::FollowUpRequired => 75.0,
        CallOutcome::NoDecision => 40.0,
        CallOutcome::Unsuccessful => 20.0,
    }
}

pub fn call_quality_score(event: &ActivityEvent) -> u8 {
    let duration = duration_optimality(event.duration_minutes());
    let outcome = outcome_score(event.outcome.unwrap_or(CallOutcome::NoDecision));
    let notes = if event.has_notes { 100.0 } else { 0.0 };

    let blended = quality::DURATION_WEIGHT * duration
        + quality::OUTCOME_WEIGHT * outcome
        + quality::NOTES_WEIGHT * notes;
    clamp_score(blended.round() as i32)
}

/// Counters over one day's events.
///
/// Calls are distinct call ids. Opportunities and closes come from ended calls.
pub fn aggregate_daily(events: &[ActivityEvent]) -> DailyStats {
    let mut calls: HashSet<&str> = HashSet::new();
    let mut stats = DailyStats::default();

    for event in events {
        calls.insert(event.call_id.as_str());
        if event.kind != EventKind::CallEnded {
            continue;
        }
        if event.duration_secs.unwrap_or(0) > 0 {
            stats.calls_connected += 1;
        }
        match event.outcome {
            Some(CallOutcome::FollowUpRequired) => stats.opportunities_today += 1,
            Some(CallOutcome::Successful) => stats.closed_today += 1,
            _ => {}
        }
    }

    stats.calls_today = calls.len() as u32;
    stats.close_rate = if stats.calls_today == 0 {
        0.0
    } else {
        f64::from(stats.closed_today) / f64::from(stats.calls_today)
    };
    stats
}
