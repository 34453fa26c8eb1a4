pub mod activity;
pub mod coaching;
pub mod error;
pub mod rep;

pub use activity::{ActivityEvent, CallOutcome, EventKind};
pub use coaching::{
    CoachingDirective, CoachingMode, CoachingSession, DeliveryOutcome, DeliveryReceipt,
    ReceiptStatus, Severity,
};
pub use error::{CoachError, ErrorCategory, ErrorClassifier, Result, ResultExt};
pub use rep::{DailyStats, InAppNotification, MetricsSnapshot, RepIdentity};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for sales rep IDs
///
/// Prevents accidental mixing of rep IDs with call, contact, or session IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepId(String);

impl RepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
