//! Activity events produced by the call-logging subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RepId;

/// Kind of rep action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CallStarted,
    CallEnded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CallStarted => "call_started",
            EventKind::CallEnded => "call_ended",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call_started" => Ok(EventKind::CallStarted),
            "call_ended" => Ok(EventKind::CallEnded),
            _ => Err(format!(
                "Unknown event kind: {}. Valid values: call_started, call_ended",
                s
            )),
        }
    }
}

/// Outcome of a finished call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Successful,
    NoDecision,
    Unsuccessful,
    FollowUpRequired,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Successful => "successful",
            CallOutcome::NoDecision => "no_decision",
            CallOutcome::Unsuccessful => "unsuccessful",
            CallOutcome::FollowUpRequired => "follow_up_required",
        }
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "successful" => Ok(CallOutcome::Successful),
            "no_decision" => Ok(CallOutcome::NoDecision),
            "unsuccessful" => Ok(CallOutcome::Unsuccessful),
            "follow_up_required" => Ok(CallOutcome::FollowUpRequired),
            _ => Err(format!(
                "Unknown call outcome: {}. Valid values: successful, no_decision, unsuccessful, follow_up_required",
                s
            )),
        }
    }
}

/// One immutable rep action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub rep_id: RepId,
    pub kind: EventKind,
    pub call_id: String,
    #[serde(default)]
    pub outcome: Option<CallOutcome>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    /// Rep attached call notes
    #[serde(default)]
    pub has_notes: bool,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn call_started(
        rep_id: impl Into<RepId>,
        call_id: impl Into<String>,
        contact_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            rep_id: rep_id.into(),
            kind: EventKind::CallStarted,
            call_id: call_id.into(),
            outcome: None,
            duration_secs: None,
            transcript: None,
            contact_id,
            has_notes: false,
            created_at,
        }
    }

    pub fn call_ended(
        rep_id: impl Into<RepId>,
        call_id: impl Into<String>,
        outcome: CallOutcome,
        duration_secs: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            rep_id: rep_id.into(),
            kind: EventKind::CallEnded,
            call_id: call_id.into(),
            outcome: Some(outcome),
            duration_secs: Some(duration_secs),
            transcript: None,
            contact_id: None,
            has_notes: false,
            created_at,
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_contact(mut self, contact_id: impl Into<String>) -> Self {
        self.contact_id = Some(contact_id.into());
        self
    }

    pub fn with_notes(mut self) -> Self {
        self.has_notes = true;
        self
    }

    /// Key used to drop replays of the same event
    pub fn dedup_key(&self) -> (String, EventKind) {
        (self.call_id.clone(), self.kind)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs.unwrap_or(0) as f64 / 60.0
    }
}
