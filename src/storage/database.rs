//! Database Layer with Connection Pooling and Safe Transactions
//!
//! SQLite store for the coaching engine:
//! - Connection pooling via r2d2 for concurrent access from rep monitors
//! - Panic-safe transactions with automatic rollback
//! - Version-tracked migrations
//! - WAL mode so readers (CLI stats) never block the writers

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::CoachStore;
use crate::types::{
    ActivityEvent, CallOutcome, CoachError, CoachingSession, DeliveryReceipt, InAppNotification,
    MetricsSnapshot, ReceiptStatus, RepId, RepIdentity, Result, ResultExt,
};

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Index call quality by rep",
    up: "CREATE INDEX IF NOT EXISTS idx_quality_rep ON call_quality (rep_id)",
}];

/// Connection pool configuration
///
/// Pool size is derived from CPU cores.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 2;
    const MAX_POOL_SIZE: u32 = 16;

    /// clamp(cores, MIN, MAX); rep monitors are mostly idle so one per core is plenty
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        cores.clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: 10,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe SQLite store with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| CoachError::Storage(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. A single connection keeps one shared database.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| CoachError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            CoachError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Create tables and bring the schema version up to date.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        drop(conn);

        self.migrate(current_version)
    }

    fn migrate(&self, current_version: u32) -> Result<()> {
        let conn = self.conn()?;

        for migration in MIGRATIONS {
            if migration.version > current_version {
                conn.execute_batch(migration.up).with_context_fn(|| {
                    format!(
                        "Failed to apply migration {}: {}",
                        migration.version, migration.description
                    )
                })?;

                tracing::info!(
                    "Applied migration {}: {}",
                    migration.version,
                    migration.description
                );
            }
        }

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to update schema version")?;
        }

        Ok(())
    }

    /// Run a closure in a transaction.
    ///
    /// Commits on `Ok`, rolls back on `Err` or panic. A panic is turned into
    /// an error instead of poisoning the pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(CoachError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Parse a text column through `FromStr`, surfacing bad values as conversion errors
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|msg| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(CoachError::Storage(msg)))
    })
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityEvent> {
    let outcome: Option<String> = row.get(3)?;
    let outcome = match outcome {
        Some(raw) => Some(raw.parse::<CallOutcome>().map_err(|msg| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                Box::new(CoachError::Storage(msg)),
            )
        })?),
        None => None,
    };

    Ok(ActivityEvent {
        rep_id: RepId::new(row.get::<_, String>(0)?),
        kind: parse_column(row, 1)?,
        call_id: row.get(2)?,
        outcome,
        duration_secs: row.get(4)?,
        transcript: row.get(5)?,
        contact_id: row.get(6)?,
        has_notes: row.get(7)?,
        created_at: from_millis(row.get(8)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<CoachingSession> {
    Ok(CoachingSession {
        id: row.get(0)?,
        rep_id: RepId::new(row.get::<_, String>(1)?),
        mode: parse_column(row, 2)?,
        trigger: row.get(3)?,
        message: row.get(4)?,
        outcome: parse_column(row, 5)?,
        severity: parse_column(row, 6)?,
        created_at: from_millis(row.get(7)?),
    })
}

fn metrics_from_row(row: &Row<'_>) -> rusqlite::Result<MetricsSnapshot> {
    Ok(MetricsSnapshot {
        rep_id: RepId::new(row.get::<_, String>(0)?),
        date: parse_date(row, 1)?,
        calls_made: row.get(2)?,
        calls_connected: row.get(3)?,
        meetings_scheduled: row.get(4)?,
        deals_closed: row.get(5)?,
        close_rate: row.get(6)?,
        score: row.get(7)?,
    })
}

const METRICS_COLUMNS: &str = "rep_id, date, calls_made, calls_connected, meetings_scheduled, deals_closed, close_rate, score";

// =============================================================================
// CoachStore
// =============================================================================

impl CoachStore for Database {
    fn ping(&self) -> Result<()> {
        self.conn()?
            .query_row("SELECT 1", [], |_| Ok(()))
            .with_context("Store ping failed")
    }

    fn upsert_reps(&self, reps: &[RepIdentity]) -> Result<()> {
        let now = millis(Utc::now());
        self.transaction(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO reps (id, name, phone, active, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    phone = excluded.phone,
                    active = 1",
            )?;
            for rep in reps {
                stmt.execute(params![rep.id.as_str(), rep.name, rep.phone, now])?;
            }
            Ok(())
        })?;

        tracing::debug!("Upserted {} reps", reps.len());
        Ok(())
    }

    fn set_rep_active(&self, rep_id: &RepId, active: bool) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE reps SET active = ?1 WHERE id = ?2",
                params![active, rep_id.as_str()],
            )
            .with_context("Failed to update rep status")?;
        Ok(changed > 0)
    }

    fn list_reps(&self, active_only: bool) -> Result<Vec<RepIdentity>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, phone FROM reps
                 WHERE active = 1 OR ?1 = 0
                 ORDER BY id",
            )
            .with_context("Failed to prepare rep query")?;

        let reps = stmt
            .query_map(params![active_only], |row| {
                Ok(RepIdentity {
                    id: RepId::new(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    phone: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch reps")?;
        Ok(reps)
    }

    fn record_event(&self, event: &ActivityEvent) -> Result<bool> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO activity_events
                 (rep_id, kind, call_id, outcome, duration_secs, transcript, contact_id, has_notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    event.rep_id.as_str(),
                    event.kind.as_str(),
                    event.call_id,
                    event.outcome.map(|o| o.as_str()),
                    event.duration_secs,
                    event.transcript,
                    event.contact_id,
                    event.has_notes,
                    millis(event.created_at),
                ],
            )
            .with_context("Failed to record activity event")?;
        Ok(inserted > 0)
    }

    fn events_between(
        &self,
        rep_id: &RepId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT rep_id, kind, call_id, outcome, duration_secs, transcript, contact_id, has_notes, created_at
                 FROM activity_events
                 WHERE rep_id = ?1 AND created_at >= ?2 AND created_at < ?3
                 ORDER BY created_at, id",
            )
            .with_context("Failed to prepare event query")?;

        let events = stmt
            .query_map(
                params![rep_id.as_str(), millis(start), millis(end)],
                event_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch activity events")?;
        Ok(events)
    }

    fn record_research(&self, rep_id: &RepId, contact_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO research_log (rep_id, contact_id, created_at) VALUES (?1, ?2, ?3)",
                params![rep_id.as_str(), contact_id, millis(at)],
            )
            .with_context("Failed to record research")?;
        Ok(())
    }

    fn has_research_since(
        &self,
        rep_id: &RepId,
        contact_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM research_log
                 WHERE rep_id = ?1 AND contact_id = ?2 AND created_at >= ?3
                 LIMIT 1",
                params![rep_id.as_str(), contact_id, millis(since)],
                |row| row.get(0),
            )
            .optional()
            .with_context("Failed to query research log")?;
        Ok(found.is_some())
    }

    fn append_session(&self, session: &CoachingSession) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO coaching_sessions
                 (id, rep_id, mode, trigger_tag, message, outcome, severity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id,
                    session.rep_id.as_str(),
                    session.mode.as_str(),
                    session.trigger,
                    session.message,
                    session.outcome.as_str(),
                    session.severity.as_str(),
                    millis(session.created_at),
                ],
            )
            .with_context("Failed to append coaching session")?;

        tracing::debug!(
            "Stored session: rep={}, mode={}",
            session.rep_id,
            session.mode
        );
        Ok(())
    }

    fn sessions_for_rep(&self, rep_id: &RepId, limit: usize) -> Result<Vec<CoachingSession>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, rep_id, mode, trigger_tag, message, outcome, severity, created_at
                 FROM coaching_sessions
                 WHERE rep_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .with_context("Failed to prepare session query")?;

        let sessions = stmt
            .query_map(params![rep_id.as_str(), limit as i64], session_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch coaching sessions")?;
        Ok(sessions)
    }

    fn append_receipt(&self, receipt: &DeliveryReceipt) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO delivery_receipts (session_id, channel, status, error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    receipt.session_id,
                    receipt.channel,
                    receipt.status.as_str(),
                    receipt.error,
                    millis(receipt.created_at),
                ],
            )
            .with_context("Failed to append delivery receipt")?;
        Ok(())
    }

    fn receipts_for_session(&self, session_id: &str) -> Result<Vec<DeliveryReceipt>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, channel, status, error, created_at
                 FROM delivery_receipts
                 WHERE session_id = ?1
                 ORDER BY id",
            )
            .with_context("Failed to prepare receipt query")?;

        let receipts = stmt
            .query_map(params![session_id], |row| {
                let status: String = row.get(2)?;
                Ok(DeliveryReceipt {
                    session_id: row.get(0)?,
                    channel: row.get(1)?,
                    status: if status == ReceiptStatus::Sent.as_str() {
                        ReceiptStatus::Sent
                    } else {
                        ReceiptStatus::Failed
                    },
                    error: row.get(3)?,
                    created_at: from_millis(row.get(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch delivery receipts")?;
        Ok(receipts)
    }

    fn push_notification(&self, notification: &InAppNotification) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO in_app_notifications (rep_id, body, created_at) VALUES (?1, ?2, ?3)",
                params![
                    notification.rep_id.as_str(),
                    notification.body,
                    millis(notification.created_at),
                ],
            )
            .with_context("Failed to store in-app notification")?;
        Ok(())
    }

    fn notifications_for_rep(&self, rep_id: &RepId) -> Result<Vec<InAppNotification>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT rep_id, body, created_at FROM in_app_notifications
                 WHERE rep_id = ?1 ORDER BY id",
            )
            .with_context("Failed to prepare notification query")?;

        let notes = stmt
            .query_map(params![rep_id.as_str()], |row| {
                Ok(InAppNotification {
                    rep_id: RepId::new(row.get::<_, String>(0)?),
                    body: row.get(1)?,
                    created_at: from_millis(row.get(2)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch notifications")?;
        Ok(notes)
    }

    fn metrics_for_day(&self, rep_id: &RepId, date: NaiveDate) -> Result<Option<MetricsSnapshot>> {
        let sql = format!(
            "SELECT {} FROM daily_metrics WHERE rep_id = ?1 AND date = ?2",
            METRICS_COLUMNS
        );
        self.conn()?
            .query_row(
                &sql,
                params![rep_id.as_str(), date.format(DATE_FORMAT).to_string()],
                metrics_from_row,
            )
            .optional()
            .with_context("Failed to load daily metrics")
    }

    fn latest_metrics(&self, rep_id: &RepId) -> Result<Option<MetricsSnapshot>> {
        let sql = format!(
            "SELECT {} FROM daily_metrics WHERE rep_id = ?1 ORDER BY date DESC LIMIT 1",
            METRICS_COLUMNS
        );
        self.conn()?
            .query_row(&sql, params![rep_id.as_str()], metrics_from_row)
            .optional()
            .with_context("Failed to load latest metrics")
    }

    fn upsert_metrics(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO daily_metrics
                 (rep_id, date, calls_made, calls_connected, meetings_scheduled, deals_closed, close_rate, score, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(rep_id, date) DO UPDATE SET
                    calls_made = excluded.calls_made,
                    calls_connected = excluded.calls_connected,
                    meetings_scheduled = excluded.meetings_scheduled,
                    deals_closed = excluded.deals_closed,
                    close_rate = excluded.close_rate,
                    score = excluded.score,
                    updated_at = excluded.updated_at",
                params![
                    snapshot.rep_id.as_str(),
                    snapshot.date.format(DATE_FORMAT).to_string(),
                    snapshot.calls_made,
                    snapshot.calls_connected,
                    snapshot.meetings_scheduled,
                    snapshot.deals_closed,
                    snapshot.close_rate,
                    snapshot.score,
                    millis(Utc::now()),
                ],
            )
            .with_context("Failed to upsert daily metrics")?;
        Ok(())
    }

    fn latest_scores(&self) -> Result<Vec<(RepId, u8)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT m.rep_id, m.score FROM daily_metrics m
                 WHERE m.date = (SELECT MAX(date) FROM daily_metrics WHERE rep_id = m.rep_id)
                 ORDER BY m.rep_id",
            )
            .with_context("Failed to prepare score query")?;

        let scores = stmt
            .query_map([], |row| {
                Ok((RepId::new(row.get::<_, String>(0)?), row.get::<_, u8>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context("Failed to fetch latest scores")?;
        Ok(scores)
    }

    fn record_call_quality(
        &self,
        rep_id: &RepId,
        call_id: &str,
        score: u8,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO call_quality (call_id, rep_id, score, computed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(call_id) DO UPDATE SET score = excluded.score, computed_at = excluded.computed_at",
                params![call_id, rep_id.as_str(), score, millis(at)],
            )
            .with_context("Failed to record call quality")?;
        Ok(())
    }

    fn call_quality(&self, call_id: &str) -> Result<Option<u8>> {
        self.conn()?
            .query_row(
                "SELECT score FROM call_quality WHERE call_id = ?1",
                params![call_id],
                |row| row.get(0),
            )
            .optional()
            .with_context("Failed to load call quality")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoachingDirective, CoachingMode, DeliveryOutcome, Severity};
    use chrono::TimeZone;

    fn db() -> Database {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        db.initialize().expect("Failed to initialize schema");
        db
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let db = db();
        let conn = db.conn().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "reps",
            "activity_events",
            "research_log",
            "coaching_sessions",
            "delivery_receipts",
            "in_app_notifications",
            "daily_metrics",
            "call_quality",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = db();
        db.initialize().expect("second initialize");
        db.ping().unwrap();
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coach.db");
        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            db.upsert_reps(&[RepIdentity::new("r1", "Dana")]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(db.list_reps(true).unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_panic_safety() {
        let db = db();
        let result = db.transaction(|_conn| {
            panic!("Intentional panic for testing");
            #[allow(unreachable_code)]
            Ok(())
        });

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("panicked"));
        assert!(db.ping().is_ok(), "pool should survive a panicking transaction");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = db();
        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO reps (id, name, active, created_at) VALUES ('r1', 'Dana', 1, 0)",
                [],
            )?;
            Err(CoachError::InvalidInput("abort".into()))
        });
        assert!(result.is_err());
        assert!(db.list_reps(false).unwrap().is_empty());
    }

    #[test]
    fn test_roster_activation() {
        let db = db();
        db.upsert_reps(&[
            RepIdentity::new("r2", "Lee"),
            RepIdentity::new("r1", "Dana").with_phone("+15550001"),
        ])
        .unwrap();

        let reps = db.list_reps(true).unwrap();
        assert_eq!(reps[0].id.as_str(), "r1");
        assert_eq!(reps[0].phone.as_deref(), Some("+15550001"));

        assert!(db.set_rep_active(&RepId::new("r2"), false).unwrap());
        assert_eq!(db.list_reps(true).unwrap().len(), 1);
        assert_eq!(db.list_reps(false).unwrap().len(), 2);
        assert!(!db.set_rep_active(&RepId::new("ghost"), false).unwrap());

        // Re-adding reactivates
        db.upsert_reps(&[RepIdentity::new("r2", "Lee")]).unwrap();
        assert_eq!(db.list_reps(true).unwrap().len(), 2);
    }

    #[test]
    fn test_events_dedupe_and_window() {
        let db = db();
        let rep = RepId::new("r1");
        let start = ActivityEvent::call_started("r1", "c1", Some("k1".into()), at(9, 0));
        let end = ActivityEvent::call_ended("r1", "c1", CallOutcome::Successful, 300, at(9, 5))
            .with_notes()
            .with_transcript("Let's sign.");

        assert!(db.record_event(&start).unwrap());
        assert!(!db.record_event(&start).unwrap(), "replay must be ignored");
        assert!(db.record_event(&end).unwrap());

        let events = db.events_between(&rep, at(0, 0), at(23, 59)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], end);

        let early = db.events_between(&rep, at(0, 0), at(9, 0)).unwrap();
        assert!(early.is_empty(), "end bound is exclusive");
    }

    #[test]
    fn test_research_window() {
        let db = db();
        let rep = RepId::new("r1");
        db.record_research(&rep, "k1", at(8, 50)).unwrap();

        assert!(db.has_research_since(&rep, "k1", at(8, 30)).unwrap());
        assert!(!db.has_research_since(&rep, "k1", at(9, 0)).unwrap());
        assert!(!db.has_research_since(&rep, "k2", at(8, 30)).unwrap());
        assert!(!db.has_research_since(&RepId::new("r2"), "k1", at(8, 30)).unwrap());
    }

    #[test]
    fn test_sessions_newest_first_with_receipts() {
        let db = db();
        let rep = RepId::new("r1");
        let first = CoachingSession::delivered(
            &rep,
            &CoachingDirective::new(CoachingMode::MorningMotivator, Severity::High, "dial"),
            at(10, 0),
        );
        let second = CoachingSession::delivered(
            &rep,
            &CoachingDirective::new(CoachingMode::Closer, Severity::Medium, "nice")
                .with_trigger("deal_closed"),
            at(11, 0),
        );
        db.append_session(&first).unwrap();
        db.append_session(&second).unwrap();

        let sessions = db.sessions_for_rep(&rep, 10).unwrap();
        assert_eq!(sessions, vec![second.clone(), first.clone()]);
        assert_eq!(db.sessions_for_rep(&rep, 1).unwrap().len(), 1);

        assert_eq!(db.session_outcome(&first.id).unwrap(), DeliveryOutcome::Delivered);

        for channel in ["voice", "sms"] {
            db.append_receipt(&DeliveryReceipt {
                session_id: first.id.clone(),
                channel: channel.into(),
                status: ReceiptStatus::Failed,
                error: Some("connection refused".into()),
                created_at: at(10, 0),
            })
            .unwrap();
        }
        assert_eq!(db.receipts_for_session(&first.id).unwrap().len(), 2);
        assert_eq!(db.session_outcome(&first.id).unwrap(), DeliveryOutcome::Failed);

        db.append_receipt(&DeliveryReceipt {
            session_id: second.id.clone(),
            channel: "in_app".into(),
            status: ReceiptStatus::Sent,
            error: None,
            created_at: at(11, 0),
        })
        .unwrap();
        assert_eq!(db.session_outcome(&second.id).unwrap(), DeliveryOutcome::Delivered);
    }

    #[test]
    fn test_metrics_upsert_and_latest() {
        let db = db();
        let rep = RepId::new("r1");
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();

        assert!(db.latest_metrics(&rep).unwrap().is_none());

        let mut snap = MetricsSnapshot::fresh(&rep, monday, 45);
        db.upsert_metrics(&snap).unwrap();
        snap.score = 55;
        snap.calls_made = 7;
        db.upsert_metrics(&snap).unwrap();

        let stored = db.metrics_for_day(&rep, monday).unwrap().unwrap();
        assert_eq!(stored.score, 55);
        assert_eq!(stored.calls_made, 7);

        db.upsert_metrics(&MetricsSnapshot::fresh(&rep, tuesday, 65)).unwrap();
        db.upsert_metrics(&MetricsSnapshot::fresh(&RepId::new("r2"), monday, 90)).unwrap();

        assert_eq!(db.latest_metrics(&rep).unwrap().unwrap().date, tuesday);
        let scores = db.latest_scores().unwrap();
        assert_eq!(
            scores,
            vec![(RepId::new("r1"), 65), (RepId::new("r2"), 90)]
        );
    }

    #[test]
    fn test_notifications_and_quality() {
        let db = db();
        let rep = RepId::new("r1");
        db.push_notification(&InAppNotification {
            rep_id: rep.clone(),
            body: "Nice close".into(),
            created_at: at(12, 0),
        })
        .unwrap();
        assert_eq!(db.notifications_for_rep(&rep).unwrap()[0].body, "Nice close");

        assert!(db.call_quality("c1").unwrap().is_none());
        db.record_call_quality(&rep, "c1", 72, at(12, 0)).unwrap();
        db.record_call_quality(&rep, "c1", 80, at(12, 1)).unwrap();
        assert_eq!(db.call_quality("c1").unwrap(), Some(80));
    }

    #[test]
    fn test_pool_config_sizing() {
        let size = PoolConfig::optimal_pool_size();
        assert!(size >= PoolConfig::MIN_POOL_SIZE);
        assert!(size <= PoolConfig::MAX_POOL_SIZE);

        let auto = PoolConfig::auto();
        assert_eq!(auto.max_size, size);
        assert!(auto.min_idle >= 1 && auto.min_idle <= auto.max_size);
    }
}
