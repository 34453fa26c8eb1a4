//! Rep identity and performance snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::RepId;
use crate::constants::score;

/// Lightweight identity record kept in the team registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepIdentity {
    pub id: RepId,
    pub name: String,
    /// E.164 number used by the SMS channel
    #[serde(default)]
    pub phone: Option<String>,
}

impl RepIdentity {
    pub fn new(id: impl Into<RepId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Today's activity aggregate for one rep
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub calls_today: u32,
    pub calls_connected: u32,
    pub opportunities_today: u32,
    pub closed_today: u32,
    pub close_rate: f64,
}

/// Daily metrics row keyed by `(rep_id, date)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub rep_id: RepId,
    pub date: NaiveDate,
    pub calls_made: u32,
    pub calls_connected: u32,
    pub meetings_scheduled: u32,
    pub deals_closed: u32,
    pub close_rate: f64,
    pub score: u8,
}

impl MetricsSnapshot {
    /// Empty row for a day, carrying over a score
    pub fn fresh(rep_id: &RepId, date: NaiveDate, score: u8) -> Self {
        Self {
            rep_id: rep_id.clone(),
            date,
            calls_made: 0,
            calls_connected: 0,
            meetings_scheduled: 0,
            deals_closed: 0,
            close_rate: 0.0,
            score,
        }
    }

    /// Default used when a rep has never been scored
    pub fn initial(rep_id: &RepId, date: NaiveDate) -> Self {
        Self::fresh(rep_id, date, score::INITIAL)
    }

    pub fn apply_stats(&mut self, stats: &DailyStats) {
        self.calls_made = stats.calls_today;
        self.calls_connected = stats.calls_connected;
        self.meetings_scheduled = stats.opportunities_today;
        self.deals_closed = stats.closed_today;
        self.close_rate = stats.close_rate;
    }
}

/// In-app notification row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub rep_id: RepId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
