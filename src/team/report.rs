//! Result shapes returned by the orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::critique::{self, CallAnalysis, CallCritique};
use crate::delivery::CircuitBreakerStats;
use crate::health::{RepHealth, RepStatus};
use crate::persona::Mood;
use crate::types::{CoachingSession, DailyStats, RepId, RepIdentity};

#[derive(Debug, Clone, Serialize)]
pub struct RepStats {
    pub rep: RepIdentity,
    pub score: u8,
    pub mood: Mood,
    pub today: DailyStats,
    /// Most recent first
    pub recent_sessions: Vec<CoachingSession>,
    pub status: RepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rep_id: RepId,
    pub score: u8,
    /// 1-based
    pub rank: usize,
    pub commentary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub goal: String,
    pub target: u32,
    pub ends_at: DateTime<Utc>,
    pub pitch: String,
}

/// Transcript review without any delivery
#[derive(Debug, Clone, Serialize)]
pub struct CallReview {
    pub analysis: CallAnalysis,
    pub critique: CallCritique,
}

impl CallReview {
    pub fn of(transcript: &str) -> Self {
        let analysis = critique::analyze(transcript);
        Self {
            critique: critique::generate_call_critique(&analysis),
            analysis,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamHealth {
    pub monitored: usize,
    pub unhealthy: Vec<UnhealthyRep>,
    pub store_ok: bool,
    pub circuits: Vec<CircuitBreakerStats>,
    pub deliveries_in_flight: usize,
}

impl TeamHealth {
    pub fn is_healthy(&self) -> bool {
        self.store_ok && self.unhealthy.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnhealthyRep {
    pub rep_id: RepId,
    #[serde(flatten)]
    pub health: RepHealth,
}
