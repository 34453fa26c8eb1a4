//! Activity Monitor
//!
//! One actor task per monitored rep, fed by two producers over a single mpsc
//! inbox:
//!
//! ```text
//! ActivityBus ──> forwarder ──┐
//!                             ├──> inbox ──> actor ──> Dispatcher
//! poll timer + checkpoints ───┘
//! ```
//!
//! The actor owns all per-rep state (dedup keys, open calls, held call ends,
//! fired checkpoints), so none of it needs a lock. Stopping signals a watch
//! channel: producers stop at once, the actor finishes its current input and
//! exits. Deliveries already handed to the dispatcher are not cancelled.

mod actor;
pub mod bus;
pub mod schedule;
pub mod triggers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

pub use actor::{MonitorHandle, spawn_monitor};
pub use bus::ActivityBus;
pub use schedule::{Checkpoint, CheckpointTimes, ScheduledCheckpoint, next_checkpoint};
pub use triggers::{Trigger, evaluate_call_ended, evaluate_checkpoint, evaluate_poll};

use crate::clock::SharedClock;
use crate::constants::{monitor as defaults, triggers as limits};
use crate::delivery::Dispatcher;
use crate::health::HealthBoard;
use crate::performance::PerformanceModel;
use crate::persona::PersonaGenerator;
use crate::storage::SharedStore;
use crate::types::ActivityEvent;

/// Tunables for every rep's monitor
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// How far back research must exist before a call start
    pub research_window: chrono::Duration,
    pub long_call_mins: u32,
    /// Hold time for a call end whose start was never seen
    pub orphan_grace: chrono::Duration,
    /// Consecutive store failures before the monitor halts
    pub max_store_failures: u32,
    pub channel_capacity: usize,
    pub checkpoints: CheckpointTimes,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(limits::POLL_INTERVAL_MINS * 60),
            research_window: chrono::Duration::minutes(limits::RESEARCH_WINDOW_MINS),
            long_call_mins: limits::LONG_CALL_MINS,
            orphan_grace: chrono::Duration::seconds(limits::ORPHAN_END_GRACE_SECS as i64),
            max_store_failures: limits::MAX_STORE_FAILURES,
            channel_capacity: defaults::CHANNEL_CAPACITY,
            checkpoints: CheckpointTimes::default(),
        }
    }
}

/// Shared collaborators handed to every monitor
#[derive(Clone)]
pub struct MonitorContext {
    pub store: SharedStore,
    pub performance: Arc<PerformanceModel>,
    pub dispatcher: Arc<Dispatcher>,
    pub persona: Arc<PersonaGenerator>,
    pub health: Arc<HealthBoard>,
    pub clock: SharedClock,
    pub settings: MonitorSettings,
}

/// Everything the actor reacts to
#[derive(Debug)]
pub enum MonitorInput {
    Event(ActivityEvent),
    Poll,
    Checkpoint(Checkpoint, chrono::NaiveDate),
    /// Acknowledged once every earlier input has been handled
    Barrier(oneshot::Sender<()>),
}
