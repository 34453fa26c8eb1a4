//! Global Constants
//!
//! Centralized constants for trigger thresholds and tuning.
//! All magic numbers should be defined here with documentation.

/// Performance score constants
pub mod score {
    /// Lowest possible score
    pub const MIN: u8 = 0;

    /// Highest possible score
    pub const MAX: u8 = 100;

    /// Score assigned to a rep with no persisted metrics
    pub const INITIAL: u8 = 50;

    /// Mood breakpoints (inclusive lower bounds)
    pub mod mood {
        pub const IMPRESSED: u8 = 80;
        pub const NEUTRAL: u8 = 60;
        pub const DISAPPOINTED: u8 = 40;
    }
}

/// Call quality blend constants
pub mod quality {
    /// Weight of the duration-optimality curve
    pub const DURATION_WEIGHT: f64 = 0.3;

    /// Weight of the outcome table
    pub const OUTCOME_WEIGHT: f64 = 0.6;

    /// Weight of the notes-present bonus
    pub const NOTES_WEIGHT: f64 = 0.1;

    /// Optimal call length window (minutes)
    pub const OPTIMAL_MIN_MINUTES: f64 = 3.0;
    pub const OPTIMAL_MAX_MINUTES: f64 = 7.0;

    /// Call length at which duration optimality reaches zero (minutes)
    pub const ZERO_SCORE_MINUTES: f64 = 20.0;
}

/// Activity monitor trigger thresholds
pub mod triggers {
    /// Polling cadence for aggregate threshold checks (minutes)
    pub const POLL_INTERVAL_MINS: u64 = 30;

    /// Window in which pre-call research must exist (minutes)
    pub const RESEARCH_WINDOW_MINS: i64 = 30;

    /// Calls longer than this without a close get flagged (minutes)
    pub const LONG_CALL_MINS: u32 = 10;

    /// Poll-loop call-volume check only runs before this local hour
    pub const VOLUME_CHECK_CUTOFF_HOUR: u32 = 14;

    /// Minimum calls expected before the cutoff hour
    pub const MIN_CALLS_BEFORE_CUTOFF: u32 = 10;

    /// Minimum calls expected at the morning checkpoint
    pub const MIN_CALLS_MORNING: u32 = 5;

    /// Minimum calls expected at the midday checkpoint
    pub const MIN_CALLS_MIDDAY: u32 = 10;

    /// Open opportunities without a close that count as a stalled pipeline
    pub const STALLED_PIPELINE_OPPORTUNITIES: u32 = 5;

    /// Closes needed for end-of-day praise
    pub const STRONG_DAY_CLOSES: u32 = 3;

    /// Hold time for a call-ended event whose start was never observed (seconds)
    pub const ORPHAN_END_GRACE_SECS: u64 = 300;

    /// Consecutive store failures before a rep's monitor halts
    pub const MAX_STORE_FAILURES: u32 = 10;
}

/// Daily checkpoint times (local hour, minute)
pub mod checkpoints {
    pub const MORNING: (u32, u32) = (10, 0);
    pub const MIDDAY: (u32, u32) = (13, 0);
    pub const FRIDAY_MOTIVATION: (u32, u32) = (15, 0);
    pub const END_OF_DAY: (u32, u32) = (17, 0);
}

/// Delivery pacing and resilience constants
pub mod delivery {
    /// Gap between suggestions on a voice session (seconds)
    pub const SUGGESTION_GAP_SECS: u64 = 2;

    /// Delay before the closing signature on a voice session (seconds)
    pub const SIGNATURE_DELAY_SECS: u64 = 5;

    /// HTTP/WebSocket request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;
}

/// Circuit breaker constants
pub mod circuit_breaker {
    /// Number of consecutive failures before opening circuit
    pub const FAILURE_THRESHOLD: u32 = 3;

    /// Duration to wait before attempting recovery (seconds)
    pub const RECOVERY_TIMEOUT_SECS: u64 = 60;
}

/// Monitor actor constants
pub mod monitor {
    /// Capacity of each rep's input queue
    pub const CHANNEL_CAPACITY: usize = 256;

    /// Sessions shown in rep stats
    pub const RECENT_SESSIONS: usize = 5;
}
