//! Per-rep health tracking.
//!
//! Store and delivery failures never escape the monitor loops. They land here
//! instead, and `health_check` reports them.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::types::RepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepStatus {
    Healthy,
    /// Recent store or delivery failure; monitoring continues
    Degraded,
    /// Monitor gave up after repeated store failures
    Halted,
}

impl RepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepStatus::Healthy => "healthy",
            RepStatus::Degraded => "degraded",
            RepStatus::Halted => "halted",
        }
    }
}

impl std::fmt::Display for RepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepHealth {
    pub status: RepStatus,
    pub last_error: Option<String>,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct HealthBoard {
    reps: DashMap<RepId, RepHealth>,
}

impl HealthBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, rep_id: &RepId, at: DateTime<Utc>) {
        self.reps.insert(
            rep_id.clone(),
            RepHealth {
                status: RepStatus::Healthy,
                last_error: None,
                since: at,
            },
        );
    }

    pub fn remove(&self, rep_id: &RepId) {
        self.reps.remove(rep_id);
    }

    pub fn mark_degraded(&self, rep_id: &RepId, error: impl Into<String>, at: DateTime<Utc>) {
        self.transition(rep_id, RepStatus::Degraded, Some(error.into()), at);
    }

    pub fn mark_halted(&self, rep_id: &RepId, error: impl Into<String>, at: DateTime<Utc>) {
        self.transition(rep_id, RepStatus::Halted, Some(error.into()), at);
    }

    /// Clear a degraded flag once the rep's store access works again. Halted is sticky.
    pub fn mark_recovered(&self, rep_id: &RepId, at: DateTime<Utc>) {
        if let Some(mut entry) = self.reps.get_mut(rep_id)
            && entry.status == RepStatus::Degraded
        {
            tracing::info!(rep_id = %rep_id, "Rep recovered");
            entry.status = RepStatus::Healthy;
            entry.since = at;
        }
    }

    /// Unknown reps report healthy
    pub fn status(&self, rep_id: &RepId) -> RepStatus {
        self.reps
            .get(rep_id)
            .map(|entry| entry.status)
            .unwrap_or(RepStatus::Healthy)
    }

    pub fn get(&self, rep_id: &RepId) -> Option<RepHealth> {
        self.reps.get(rep_id).map(|entry| entry.clone())
    }

    /// Every rep that is not healthy, sorted by id
    pub fn unhealthy(&self) -> Vec<(RepId, RepHealth)> {
        let mut out: Vec<_> = self
            .reps
            .iter()
            .filter(|entry| entry.status != RepStatus::Healthy)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn transition(
        &self,
        rep_id: &RepId,
        status: RepStatus,
        error: Option<String>,
        at: DateTime<Utc>,
    ) {
        let mut entry = self.reps.entry(rep_id.clone()).or_insert(RepHealth {
            status,
            last_error: None,
            since: at,
        });
        if entry.status == RepStatus::Halted && status != RepStatus::Halted {
            entry.last_error = error;
            return;
        }
        if entry.status != status {
            tracing::warn!(rep_id = %rep_id, status = %status, "Rep health changed");
            entry.since = at;
        }
        entry.status = status;
        entry.last_error = error;
    }
}
