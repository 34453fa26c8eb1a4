//! Persistence for the coaching engine.
//!
//! The engine talks to storage through [`CoachStore`]; [`Database`] is the
//! SQLite implementation.

pub mod database;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

pub use database::{Database, PoolConfig};

use crate::types::{
    ActivityEvent, CoachingSession, DeliveryOutcome, DeliveryReceipt, InAppNotification,
    MetricsSnapshot, ReceiptStatus, RepId, RepIdentity, Result,
};

pub type SharedStore = Arc<dyn CoachStore>;

/// Query shapes the engine needs from the store
pub trait CoachStore: Send + Sync {
    /// Cheap reachability probe
    fn ping(&self) -> Result<()>;

    // ---- roster -------------------------------------------------------------

    fn upsert_reps(&self, reps: &[RepIdentity]) -> Result<()>;
    fn set_rep_active(&self, rep_id: &RepId, active: bool) -> Result<bool>;
    fn list_reps(&self, active_only: bool) -> Result<Vec<RepIdentity>>;

    // ---- activity -----------------------------------------------------------

    /// Returns false when the same (rep, call, kind) was already recorded
    fn record_event(&self, event: &ActivityEvent) -> Result<bool>;
    fn events_between(
        &self,
        rep_id: &RepId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>>;

    fn record_research(&self, rep_id: &RepId, contact_id: &str, at: DateTime<Utc>) -> Result<()>;
    fn has_research_since(
        &self,
        rep_id: &RepId,
        contact_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    // ---- coaching audit trail ----------------------------------------------

    fn append_session(&self, session: &CoachingSession) -> Result<()>;
    /// Most recent first
    fn sessions_for_rep(&self, rep_id: &RepId, limit: usize) -> Result<Vec<CoachingSession>>;
    fn append_receipt(&self, receipt: &DeliveryReceipt) -> Result<()>;
    fn receipts_for_session(&self, session_id: &str) -> Result<Vec<DeliveryReceipt>>;

    fn push_notification(&self, notification: &InAppNotification) -> Result<()>;
    fn notifications_for_rep(&self, rep_id: &RepId) -> Result<Vec<InAppNotification>>;

    // ---- performance --------------------------------------------------------

    fn metrics_for_day(&self, rep_id: &RepId, date: NaiveDate) -> Result<Option<MetricsSnapshot>>;
    fn latest_metrics(&self, rep_id: &RepId) -> Result<Option<MetricsSnapshot>>;
    fn upsert_metrics(&self, snapshot: &MetricsSnapshot) -> Result<()>;
    /// Score from each rep's most recent metrics row
    fn latest_scores(&self) -> Result<Vec<(RepId, u8)>>;

    fn record_call_quality(
        &self,
        rep_id: &RepId,
        call_id: &str,
        score: u8,
        at: DateTime<Utc>,
    ) -> Result<()>;
    fn call_quality(&self, call_id: &str) -> Result<Option<u8>>;

    /// Effective outcome of a session, folding in its transport receipts.
    ///
    /// A session stays `delivered` until every recorded attempt has failed.
    fn session_outcome(&self, session_id: &str) -> Result<DeliveryOutcome> {
        let receipts = self.receipts_for_session(session_id)?;
        let all_failed = !receipts.is_empty()
            && receipts.iter().all(|r| r.status == ReceiptStatus::Failed);
        Ok(if all_failed {
            DeliveryOutcome::Failed
        } else {
            DeliveryOutcome::Delivered
        })
    }
}
