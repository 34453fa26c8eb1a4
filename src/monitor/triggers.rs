//! Trigger rules.
//!
//! Pure functions from (event or time, daily stats) to the directives that
//! should fire. The actor renders each [`Trigger`] through the persona and
//! hands it to the dispatcher.

use chrono::{DateTime, FixedOffset, Timelike};

use super::schedule::Checkpoint;
use crate::constants::triggers as limits;
use crate::critique::{self, WeakPoint};
use crate::persona::category;
use crate::types::{ActivityEvent, CallOutcome, CoachingMode, DailyStats, Severity};

/// A rule that fired, before persona rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub mode: CoachingMode,
    pub severity: Severity,
    pub category: &'static str,
    pub subcategory: Option<&'static str>,
    /// Stored on the session as the trigger tag
    pub tag: String,
    /// Appended to the persona line
    pub detail: Option<String>,
    pub suggestions: Vec<String>,
    pub action_required: bool,
}

impl Trigger {
    fn new(mode: CoachingMode, severity: Severity, category: &'static str, tag: impl Into<String>) -> Self {
        Self {
            mode,
            severity,
            category,
            subcategory: None,
            tag: tag.into(),
            detail: None,
            suggestions: Vec::new(),
            action_required: false,
        }
    }

    fn sub(mut self, subcategory: &'static str) -> Self {
        self.subcategory = Some(subcategory);
        self
    }
}

/// Call started without research on the contact
pub fn no_research() -> Trigger {
    let mut trigger = Trigger::new(
        CoachingMode::PostCallCritic,
        Severity::High,
        category::NO_RESEARCH,
        "no_research",
    );
    trigger.action_required = true;
    trigger
}

/// Rules for a finished call. A missing outcome counts as no decision.
pub fn evaluate_call_ended(event: &ActivityEvent, long_call_mins: u32) -> Vec<Trigger> {
    let outcome = event.outcome.unwrap_or(CallOutcome::NoDecision);
    let mut fired = Vec::new();

    match outcome {
        CallOutcome::Unsuccessful | CallOutcome::NoDecision => {
            fired.push(critique_trigger(event, outcome));
        }
        CallOutcome::Successful => {
            fired.push(Trigger::new(
                CoachingMode::Closer,
                Severity::Medium,
                category::CLOSER,
                "deal_closed",
            ));
        }
        CallOutcome::FollowUpRequired => {}
    }

    let long_call_secs = long_call_mins.saturating_mul(60);
    if outcome != CallOutcome::Successful && event.duration_secs.unwrap_or(0) > long_call_secs {
        fired.push(Trigger::new(
            CoachingMode::PostCallCritic,
            Severity::High,
            category::LONG_CALL,
            "long_call",
        ));
    }

    fired
}

fn critique_trigger(event: &ActivityEvent, outcome: CallOutcome) -> Trigger {
    let mut trigger = Trigger::new(
        CoachingMode::PostCallCritic,
        Severity::High,
        category::POST_CALL,
        format!("call_outcome:{}", outcome),
    );
    trigger.action_required = true;

    let Some(transcript) = event.transcript.as_deref().filter(|t| !t.trim().is_empty()) else {
        return trigger;
    };

    let analysis = critique::analyze(transcript);
    let critique = critique::generate_call_critique(&analysis);
    trigger.subcategory = match analysis.weakest_point {
        WeakPoint::WeakOpening => Some("weak_opening"),
        WeakPoint::NoPainDiscovery => Some("no_pain_discovery"),
        WeakPoint::NoCloseAttempt => Some("no_close_attempt"),
        WeakPoint::None => Some("qualified"),
    };
    trigger.detail = Some(critique.message);
    trigger.suggestions = critique.suggestions;
    trigger
}

/// Rules checked on every poll tick
pub fn evaluate_poll(now: DateTime<FixedOffset>, stats: &DailyStats) -> Vec<Trigger> {
    let mut fired = Vec::new();

    if now.hour() < limits::VOLUME_CHECK_CUTOFF_HOUR && stats.calls_today < limits::MIN_CALLS_BEFORE_CUTOFF {
        fired.push(Trigger::new(
            CoachingMode::PerformanceReviewer,
            Severity::High,
            category::SLOW_START,
            "low_call_volume",
        ));
    }

    if stats.opportunities_today > limits::STALLED_PIPELINE_OPPORTUNITIES && stats.closed_today == 0 {
        let mut trigger = Trigger::new(
            CoachingMode::PerformanceReviewer,
            Severity::Immediate,
            category::PIPELINE_STALL,
            "stalled_pipeline",
        );
        trigger.action_required = true;
        fired.push(trigger);
    }

    fired
}

/// Rule for a daily checkpoint
pub fn evaluate_checkpoint(checkpoint: Checkpoint, stats: &DailyStats) -> Option<Trigger> {
    match checkpoint {
        Checkpoint::Morning => (stats.calls_today < limits::MIN_CALLS_MORNING).then(|| {
            Trigger::new(
                CoachingMode::MorningMotivator,
                Severity::High,
                category::MORNING,
                "morning_checkpoint",
            )
        }),
        Checkpoint::Midday => (stats.calls_today < limits::MIN_CALLS_MIDDAY).then(|| {
            Trigger::new(
                CoachingMode::PerformanceReviewer,
                Severity::High,
                category::SLOW_START,
                "midday_checkpoint",
            )
            .sub("midday")
        }),
        Checkpoint::FridayMotivation => Some(Trigger::new(
            CoachingMode::MorningMotivator,
            Severity::Medium,
            category::FRIDAY,
            "friday_motivation",
        )),
        Checkpoint::EndOfDay => {
            let (sub, severity) = if stats.closed_today >= limits::STRONG_DAY_CLOSES {
                ("praise", Severity::Medium)
            } else if stats.closed_today == 0 {
                ("harsh", Severity::High)
            } else {
                ("average", Severity::Medium)
            };
            Some(
                Trigger::new(
                    CoachingMode::PerformanceReviewer,
                    severity,
                    category::END_OF_DAY,
                    "end_of_day",
                )
                .sub(sub),
            )
        }
    }
}
