//! repcoach - Real-Time Sales Coaching Engine
//!
//! Watches each sales rep's call activity, decides when a coaching
//! intervention is warranted, renders it in a blunt coaching persona and
//! delivers it by voice, SMS or in-app notification depending on urgency.
//!
//! ## Core Features
//!
//! - **Per-rep monitors**: one actor per rep fed by live events, a poll timer
//!   and wall-clock checkpoints
//! - **Call critique**: keyword analysis of transcripts with a single weakest
//!   point to fix
//! - **Performance score**: 0-100 per rep, moved by every coaching session
//! - **Channel fallback**: voice → SMS → in-app with per-channel circuit breakers
//!
//! ## Quick Start
//!
//! ```ignore
//! use repcoach::cli::CommandContext;
//! use repcoach::{Config, Database, RepIdentity};
//!
//! let db = Database::open(".repcoach/repcoach.db")?;
//! db.initialize()?;
//! let ctx = CommandContext::with_store(Config::default(), Arc::new(db));
//! let team = ctx.orchestrator()?;
//! team.add_rep(RepIdentity::new("rep-1", "Dana")).await?;
//! team.publish(event).await?;
//! team.shutdown().await;
//! ```
//!
//! ## Modules
//!
//! - [`monitor`]: activity bus, per-rep actors, trigger rules, schedule
//! - [`delivery`]: channels, router, circuit breakers, dispatcher
//! - [`team`]: the orchestrator external callers drive
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`config`]: layered configuration

pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod critique;
pub mod delivery;
pub mod health;
pub mod monitor;
pub mod performance;
pub mod persona;
pub mod storage;
pub mod team;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{CoachError, ErrorCategory, Result, ResultExt};

// Domain
pub use types::{
    ActivityEvent, CallOutcome, CoachingDirective, CoachingMode, CoachingSession, DailyStats,
    RepId, RepIdentity, Severity,
};

// Storage
pub use storage::{CoachStore, Database, PoolConfig, SharedStore};

// Engine
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use delivery::{ChannelKind, DeliveryChannel, DeliveryScript, Dispatcher};
pub use monitor::{ActivityBus, Checkpoint, MonitorContext, MonitorSettings};
pub use persona::{Mood, PersonaGenerator};
pub use team::TeamOrchestrator;
