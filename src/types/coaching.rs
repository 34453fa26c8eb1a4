//! Coaching directives and the persisted audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RepId;

/// Coaching archetype of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingMode {
    MorningMotivator,
    PostCallCritic,
    PerformanceReviewer,
    Closer,
    LiveDemoMaster,
}

impl CoachingMode {
    pub const ALL: [CoachingMode; 5] = [
        CoachingMode::MorningMotivator,
        CoachingMode::PostCallCritic,
        CoachingMode::PerformanceReviewer,
        CoachingMode::Closer,
        CoachingMode::LiveDemoMaster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoachingMode::MorningMotivator => "morning_motivator",
            CoachingMode::PostCallCritic => "post_call_critic",
            CoachingMode::PerformanceReviewer => "performance_reviewer",
            CoachingMode::Closer => "closer",
            CoachingMode::LiveDemoMaster => "live_demo_master",
        }
    }

    /// Score adjustment applied after a directive of this mode is delivered
    pub fn score_delta(&self) -> i32 {
        match self {
            CoachingMode::PostCallCritic => -5,
            CoachingMode::Closer => 10,
            _ => 0,
        }
    }
}

impl std::fmt::Display for CoachingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CoachingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        CoachingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| format!("Unknown coaching mode: {}", s))
    }
}

/// Urgency tier controlling the delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Immediate,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Immediate => "immediate",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(Severity::Immediate),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            _ => Err(format!(
                "Unknown severity: {}. Valid values: immediate, high, medium",
                s
            )),
        }
    }
}

/// Internally generated coaching instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingDirective {
    pub mode: CoachingMode,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Diagnostic label describing what fired
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub action_required: bool,
}

impl CoachingDirective {
    pub fn new(mode: CoachingMode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
            severity,
            suggestions: Vec::new(),
            trigger: None,
            action_required: false,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn requiring_action(mut self) -> Self {
        self.action_required = true;
        self
    }
}

/// Delivery outcome recorded on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

impl std::str::FromStr for DeliveryOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivered" => Ok(DeliveryOutcome::Delivered),
            "failed" => Ok(DeliveryOutcome::Failed),
            _ => Err(format!("Unknown delivery outcome: {}", s)),
        }
    }
}

/// Append-only record of one directive handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingSession {
    pub id: String,
    pub rep_id: RepId,
    pub mode: CoachingMode,
    pub trigger: Option<String>,
    pub message: String,
    pub outcome: DeliveryOutcome,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl CoachingSession {
    /// Session for a directive, recorded optimistically as delivered
    pub fn delivered(rep_id: &RepId, directive: &CoachingDirective, at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rep_id: rep_id.clone(),
            mode: directive.mode,
            trigger: directive.trigger.clone(),
            message: directive.message.clone(),
            outcome: DeliveryOutcome::Delivered,
            severity: directive.severity,
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Sent,
    Failed,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Sent => "sent",
            ReceiptStatus::Failed => "failed",
        }
    }
}

/// Transport result for one channel attempt of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub session_id: String,
    pub channel: String,
    pub status: ReceiptStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_deltas() {
        assert_eq!(CoachingMode::PostCallCritic.score_delta(), -5);
        assert_eq!(CoachingMode::Closer.score_delta(), 10);
        assert_eq!(CoachingMode::MorningMotivator.score_delta(), 0);
        assert_eq!(CoachingMode::PerformanceReviewer.score_delta(), 0);
        assert_eq!(CoachingMode::LiveDemoMaster.score_delta(), 0);
    }

    #[test]
    fn test_mode_parse_accepts_kebab_case() {
        assert_eq!(
            "morning-motivator".parse::<CoachingMode>().unwrap(),
            CoachingMode::MorningMotivator
        );
        assert_eq!(
            "post_call_critic".parse::<CoachingMode>().unwrap(),
            CoachingMode::PostCallCritic
        );
        assert!("cheerleader".parse::<CoachingMode>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Immediate > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
    }

    #[test]
    fn test_session_from_directive() {
        let directive = CoachingDirective::new(CoachingMode::Closer, Severity::Medium, "Nice close")
            .with_trigger("call_successful:c-1");
        let session = CoachingSession::delivered(&RepId::new("rep-1"), &directive, Utc::now());
        assert_eq!(session.outcome, DeliveryOutcome::Delivered);
        assert_eq!(session.trigger.as_deref(), Some("call_successful:c-1"));
        assert_eq!(session.message, "Nice close");
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
    }
}
