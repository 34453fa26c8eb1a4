//! Daily checkpoint schedule.
//!
//! | Checkpoint          | Default    | Days     |
//! |---------------------|------------|----------|
//! | `Morning`           | 10:00      | every    |
//! | `Midday`            | 13:00      | every    |
//! | `FridayMotivation`  | 15:00      | Fridays  |
//! | `EndOfDay`          | 17:00      | every    |
//!
//! The 13:00 checkpoint and the 30-minute poll both check call volume, so a
//! rep under ten calls at 13:00 can get two slow-start directives. Both fire.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

use crate::constants::checkpoints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Morning,
    Midday,
    FridayMotivation,
    EndOfDay,
}

impl Checkpoint {
    /// In time-of-day order
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::Morning,
        Checkpoint::Midday,
        Checkpoint::FridayMotivation,
        Checkpoint::EndOfDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Checkpoint::Morning => "morning",
            Checkpoint::Midday => "midday",
            Checkpoint::FridayMotivation => "friday_motivation",
            Checkpoint::EndOfDay => "end_of_day",
        }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            Checkpoint::FridayMotivation => date.weekday() == Weekday::Fri,
            _ => true,
        }
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local time of day for each checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointTimes {
    pub morning: NaiveTime,
    pub midday: NaiveTime,
    pub friday_motivation: NaiveTime,
    pub end_of_day: NaiveTime,
}

impl CheckpointTimes {
    /// Build from whole local hours
    pub fn from_hours(morning: u32, midday: u32, friday_motivation: u32, end_of_day: u32) -> Self {
        let at = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            morning: at(morning),
            midday: at(midday),
            friday_motivation: at(friday_motivation),
            end_of_day: at(end_of_day),
        }
    }

    pub fn time_of(&self, checkpoint: Checkpoint) -> NaiveTime {
        match checkpoint {
            Checkpoint::Morning => self.morning,
            Checkpoint::Midday => self.midday,
            Checkpoint::FridayMotivation => self.friday_motivation,
            Checkpoint::EndOfDay => self.end_of_day,
        }
    }
}

impl Default for CheckpointTimes {
    fn default() -> Self {
        let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self {
            morning: at(checkpoints::MORNING),
            midday: at(checkpoints::MIDDAY),
            friday_motivation: at(checkpoints::FRIDAY_MOTIVATION),
            end_of_day: at(checkpoints::END_OF_DAY),
        }
    }
}

/// A checkpoint occurrence on a specific local date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCheckpoint {
    pub checkpoint: Checkpoint,
    pub date: NaiveDate,
    pub at: DateTime<FixedOffset>,
}

/// First checkpoint strictly after `now`. Ties on the same instant resolve
/// in [`Checkpoint::ALL`] order.
pub fn next_checkpoint(
    now: DateTime<FixedOffset>,
    times: &CheckpointTimes,
) -> Option<ScheduledCheckpoint> {
    let offset = *now.offset();
    let today = now.date_naive();

    (0..=7).find_map(|days| {
        let date = today + Duration::days(days);
        let mut candidates: Vec<ScheduledCheckpoint> = Checkpoint::ALL
            .iter()
            .filter(|cp| cp.applies_on(date))
            .filter_map(|cp| {
                let at = date
                    .and_time(times.time_of(*cp))
                    .and_local_timezone(offset)
                    .single()?;
                Some(ScheduledCheckpoint {
                    checkpoint: *cp,
                    date,
                    at,
                })
            })
            .filter(|scheduled| scheduled.at > now)
            .collect();
        candidates.sort_by_key(|scheduled| scheduled.at);
        candidates.into_iter().next()
    })
}
