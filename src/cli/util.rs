//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::clock::{SharedClock, SystemClock};
use crate::config::{Config, ConfigLoader};
use crate::delivery::{
    ChannelRouter, Dispatcher, InAppChannel, SharedChannel, SmsChannel, VoiceChannel,
};
use crate::health::HealthBoard;
use crate::monitor::{ActivityBus, MonitorContext};
use crate::performance::PerformanceModel;
use crate::persona::PersonaGenerator;
use crate::storage::{Database, PoolConfig, SharedStore};
use crate::team::TeamOrchestrator;
use crate::types::{CoachError, RepIdentity, Result};

/// Command execution context
///
/// Config plus an opened, migrated store. Commands that coach build a
/// [`TeamOrchestrator`] from it.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub store: SharedStore,
    pub clock: SharedClock,
}

impl CommandContext {
    /// Load config and open the database. Fails if `init` was never run.
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let db_path = config.storage.db_path.clone();
        if !db_path.exists() {
            return Err(CoachError::NotInitialized);
        }
        let db = open_database(&db_path, &config)?;
        Ok(Self::with_store(config, Arc::new(db)))
    }

    pub fn with_store(config: Config, store: SharedStore) -> Self {
        let clock: SharedClock = Arc::new(SystemClock::from_offset_minutes(
            config.monitor.utc_offset_minutes,
        ));
        Self {
            config,
            store,
            clock,
        }
    }

    /// Wire the coaching engine: channels, router, dispatcher, monitors
    pub fn orchestrator(&self) -> Result<TeamOrchestrator> {
        let delivery = &self.config.delivery;
        let timeout = delivery.request_timeout();

        let voice: SharedChannel = Arc::new(VoiceChannel::new(
            delivery.voice_endpoint()?,
            delivery.pacing(),
            timeout,
        ));
        let sms: SharedChannel = Arc::new(SmsChannel::new(
            delivery.sms_endpoint()?,
            delivery.sms_token.clone(),
            delivery.sms_from.clone(),
            timeout,
        )?);
        let in_app: SharedChannel = Arc::new(InAppChannel::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        ));
        let router = Arc::new(
            ChannelRouter::new(delivery.breaker())
                .with_channel(voice)
                .with_channel(sms)
                .with_channel(in_app),
        );

        let performance = Arc::new(PerformanceModel::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        ));
        let persona = Arc::new(PersonaGenerator::from_seed_option(self.config.persona.seed));
        let health = Arc::new(HealthBoard::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&self.store),
            router,
            Arc::clone(&performance),
            Arc::clone(&persona),
            Arc::clone(&health),
            Arc::clone(&self.clock),
        ));

        let ctx = MonitorContext {
            store: Arc::clone(&self.store),
            performance,
            dispatcher,
            persona,
            health,
            clock: Arc::clone(&self.clock),
            settings: self.config.monitor.settings(),
        };
        let bus = Arc::new(ActivityBus::new(
            Arc::clone(&self.store),
            self.config.monitor.channel_capacity,
        ));
        Ok(TeamOrchestrator::new(ctx, bus))
    }

    /// Configured reps first, then active reps added through `team add`
    pub fn roster(&self) -> Result<Vec<RepIdentity>> {
        let mut reps = self.config.team.reps.clone();
        for rep in self.store.list_reps(true)? {
            if !reps.iter().any(|r| r.id == rep.id) {
                reps.push(rep);
            }
        }
        Ok(reps)
    }

    /// Orchestrator with the whole roster registered
    pub async fn start_team(&self) -> Result<TeamOrchestrator> {
        let team = self.orchestrator()?;
        let roster = self.roster()?;
        debug!(reps = roster.len(), "Starting team");
        team.initialize_team(roster).await?;
        Ok(team)
    }
}

/// Open the database at `path` with the configured pool size
pub fn open_database(path: &Path, config: &Config) -> Result<Database> {
    let pool = config
        .storage
        .pool_max_size
        .map(|max_size| PoolConfig {
            max_size,
            min_idle: (max_size / 4).max(1),
            ..PoolConfig::auto()
        })
        .unwrap_or_else(PoolConfig::auto);
    Database::open_with_config(path, pool)
}

/// Create and initialize the database
///
/// Creates the parent directory if needed and applies the schema.
pub fn create_database(path: &Path, config: &Config) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = open_database(path, config)?;
    db.initialize()?;
    Ok(db)
}

/// Check if repcoach is initialized in the current directory
pub fn is_initialized(config: &Config) -> bool {
    config.storage.db_path.exists()
}

/// Read a whole input file, or stdin for `None` / `-`
pub fn read_input(path: Option<&PathBuf>) -> Result<String> {
    use std::io::Read;

    match path {
        Some(p) if p.as_os_str() != "-" => Ok(std::fs::read_to_string(p)?),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
