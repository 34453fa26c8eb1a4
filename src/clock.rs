//! Wall-clock abstraction.
//!
//! Trigger rules depend on local time of day, so the monitor reads time through
//! [`Clock`] instead of calling `Utc::now()` directly.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};

pub type SharedClock = Arc<dyn Clock>;

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Offset used to interpret "local" business hours
    fn offset(&self) -> FixedOffset;

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset())
    }

    fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }

    /// UTC bounds `[start, end)` of a local calendar day
    fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset_secs = i64::from(self.offset().local_minus_utc());
        let start = day.and_time(NaiveTime::MIN) - Duration::seconds(offset_secs);
        let start = DateTime::<Utc>::from_naive_utc_and_offset(start, Utc);
        (start, start + Duration::days(1))
    }
}

/// Real clock. Uses the configured offset, or the host's offset when none is set.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new(offset: Option<FixedOffset>) -> Self {
        Self { offset }
    }

    /// Build from an offset in minutes east of UTC
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        Self::new(minutes.and_then(|m| FixedOffset::east_opt(m * 60)))
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset.unwrap_or_else(|| Local::now().offset().fix())
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: RwLock::new(now),
            offset,
        }
    }

    /// Clock at a local wall time in UTC+0
    pub fn at_utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.read().map(|guard| *guard).unwrap_or_else(|e| *e.into_inner())
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
