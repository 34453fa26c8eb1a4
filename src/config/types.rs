//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/repcoach/) and project (.repcoach/) level configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{checkpoints, circuit_breaker, delivery, monitor, triggers};
use crate::delivery::{CircuitBreakerConfig, Pacing};
use crate::monitor::{CheckpointTimes, MonitorSettings};
use crate::types::{CoachError, RepIdentity, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    pub storage: StorageConfig,

    /// Trigger cadence and thresholds
    pub monitor: MonitorConfig,

    /// Channel endpoints, pacing and circuit breaking
    pub delivery: DeliveryConfig,

    pub persona: PersonaConfig,

    /// Roster loaded by `repcoach run`
    pub team: TeamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            storage: StorageConfig::default(),
            monitor: MonitorConfig::default(),
            delivery: DeliveryConfig::default(),
            persona: PersonaConfig::default(),
            team: TeamConfig::default(),
        }
    }
}

fn invalid(message: impl Into<String>) -> CoachError {
    CoachError::Config(message.into())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `CoachError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        self.delivery.validate()?;

        let mut seen = std::collections::HashSet::new();
        for rep in &self.team.reps {
            if rep.id.as_str().trim().is_empty() {
                return Err(invalid("team.reps entries need a non-empty id"));
            }
            if !seen.insert(rep.id.clone()) {
                return Err(invalid(format!("duplicate rep id in team.reps: {}", rep.id)));
            }
        }

        Ok(())
    }

    /// Copy with secrets replaced, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.delivery.sms_token.is_some() {
            config.delivery.sms_token = Some("[REDACTED]".to_string());
        }
        config
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size override (defaults to CPU count, clamped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_max_size: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".repcoach/repcoach.db"),
            pool_max_size: None,
        }
    }
}

// =============================================================================
// Monitor Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_mins: u64,
    pub research_window_mins: i64,
    pub long_call_mins: u32,

    /// Minutes east of UTC for business hours (host offset when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,

    pub orphan_grace_secs: u64,
    pub max_store_failures: u32,
    pub channel_capacity: usize,

    /// Checkpoint local hours
    pub morning_hour: u32,
    pub midday_hour: u32,
    pub friday_hour: u32,
    pub end_of_day_hour: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_mins: triggers::POLL_INTERVAL_MINS,
            research_window_mins: triggers::RESEARCH_WINDOW_MINS,
            long_call_mins: triggers::LONG_CALL_MINS,
            utc_offset_minutes: None,
            orphan_grace_secs: triggers::ORPHAN_END_GRACE_SECS,
            max_store_failures: triggers::MAX_STORE_FAILURES,
            channel_capacity: monitor::CHANNEL_CAPACITY,
            morning_hour: checkpoints::MORNING.0,
            midday_hour: checkpoints::MIDDAY.0,
            friday_hour: checkpoints::FRIDAY_MOTIVATION.0,
            end_of_day_hour: checkpoints::END_OF_DAY.0,
        }
    }
}

impl MonitorConfig {
    fn validate(&self) -> Result<()> {
        if self.poll_interval_mins == 0 {
            return Err(invalid("monitor.poll_interval_mins must be greater than 0"));
        }
        if self.research_window_mins <= 0 {
            return Err(invalid("monitor.research_window_mins must be greater than 0"));
        }
        if self.long_call_mins == 0 {
            return Err(invalid("monitor.long_call_mins must be greater than 0"));
        }
        if self.max_store_failures == 0 {
            return Err(invalid("monitor.max_store_failures must be greater than 0"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("monitor.channel_capacity must be greater than 0"));
        }
        if let Some(offset) = self.utc_offset_minutes
            && !(-14 * 60..=14 * 60).contains(&offset)
        {
            return Err(invalid(format!(
                "monitor.utc_offset_minutes must be within ±840, got {}",
                offset
            )));
        }
        for (name, hour) in [
            ("morning_hour", self.morning_hour),
            ("midday_hour", self.midday_hour),
            ("friday_hour", self.friday_hour),
            ("end_of_day_hour", self.end_of_day_hour),
        ] {
            if hour > 23 {
                return Err(invalid(format!(
                    "monitor.{} must be between 0 and 23, got {}",
                    name, hour
                )));
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_mins * 60),
            research_window: chrono::Duration::minutes(self.research_window_mins),
            long_call_mins: self.long_call_mins,
            orphan_grace: chrono::Duration::seconds(
                i64::try_from(self.orphan_grace_secs).unwrap_or(i64::MAX / 1000),
            ),
            max_store_failures: self.max_store_failures,
            channel_capacity: self.channel_capacity,
            checkpoints: CheckpointTimes::from_hours(
                self.morning_hour,
                self.midday_hour,
                self.friday_hour,
                self.end_of_day_hour,
            ),
        }
    }
}

// =============================================================================
// Delivery Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Speech synthesis WebSocket endpoint (ws:// or wss://)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_url: Option<String>,

    /// SMS gateway endpoint (http:// or https://)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_gateway_url: Option<String>,

    /// Bearer token for the SMS gateway (prefer REPCOACH_DELIVERY__SMS_TOKEN)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_token: Option<String>,

    /// Sender number passed to the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_from: Option<String>,

    pub request_timeout_secs: u64,
    pub suggestion_gap_secs: u64,
    pub signature_delay_secs: u64,

    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            voice_url: None,
            sms_gateway_url: None,
            sms_token: None,
            sms_from: None,
            request_timeout_secs: delivery::REQUEST_TIMEOUT_SECS,
            suggestion_gap_secs: delivery::SUGGESTION_GAP_SECS,
            signature_delay_secs: delivery::SIGNATURE_DELAY_SECS,
            failure_threshold: circuit_breaker::FAILURE_THRESHOLD,
            recovery_timeout_secs: circuit_breaker::RECOVERY_TIMEOUT_SECS,
        }
    }
}

impl DeliveryConfig {
    fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(invalid("delivery.request_timeout_secs must be greater than 0"));
        }
        if self.failure_threshold == 0 {
            return Err(invalid("delivery.failure_threshold must be greater than 0"));
        }
        self.voice_endpoint()?;
        self.sms_endpoint()?;
        Ok(())
    }

    fn parse_url(field: &str, raw: Option<&str>, schemes: &[&str]) -> Result<Option<Url>> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let url = Url::parse(raw)
            .map_err(|e| invalid(format!("delivery.{} is not a valid URL: {}", field, e)))?;
        if !schemes.contains(&url.scheme()) {
            return Err(invalid(format!(
                "delivery.{} must use {}, got {}",
                field,
                schemes.join(" or "),
                url.scheme()
            )));
        }
        Ok(Some(url))
    }

    pub fn voice_endpoint(&self) -> Result<Option<Url>> {
        Self::parse_url("voice_url", self.voice_url.as_deref(), &["ws", "wss"])
    }

    pub fn sms_endpoint(&self) -> Result<Option<Url>> {
        Self::parse_url(
            "sms_gateway_url",
            self.sms_gateway_url.as_deref(),
            &["http", "https"],
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            suggestion_gap: Duration::from_secs(self.suggestion_gap_secs),
            signature_delay: Duration::from_secs(self.signature_delay_secs),
        }
    }

    pub fn breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            open_timeout: Duration::from_secs(self.recovery_timeout_secs),
        }
    }
}

// =============================================================================
// Persona & Team Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Fixed RNG seed for reproducible phrasing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub reps: Vec<RepIdentity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        let settings = config.monitor.settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(30 * 60));
        assert_eq!(settings.long_call_mins, 10);
        assert_eq!(config.delivery.pacing().signature_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        config.monitor.poll_interval_mins = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitor.end_of_day_hour = 24;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitor.utc_offset_minutes = Some(15 * 60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_schemes() {
        let mut config = Config::default();
        config.delivery.voice_url = Some("https://speech.example.com".into());
        assert!(config.validate().is_err());

        config.delivery.voice_url = Some("wss://speech.example.com/stream".into());
        config.delivery.sms_gateway_url = Some("https://sms.example.com/send".into());
        config.validate().unwrap();
        assert!(config.delivery.voice_endpoint().unwrap().is_some());
    }

    #[test]
    fn test_duplicate_reps_rejected() {
        let mut config = Config::default();
        config.team.reps = vec![
            RepIdentity::new("r1", "Dana"),
            RepIdentity::new("r1", "Sam"),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut config = Config::default();
        config.delivery.sms_token = Some("secret-token".into());
        let shown = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("[REDACTED]"));
    }
}
