//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/repcoach/config.toml)
//! 3. Project config (.repcoach/config.toml)
//! 4. Environment variables (REPCOACH_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{CoachError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(Self::global_config_path(), &Self::project_config_path())
    }

    /// Same chain with an explicit project config file
    pub fn load_with_project(project_path: &Path) -> Result<Config> {
        Self::load_layers(Self::global_config_path(), project_path)
    }

    fn load_layers(global_path: Option<PathBuf>, project_path: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        // REPCOACH_MONITOR__LONG_CALL_MINS -> monitor.long_call_mins
        figment = figment.merge(Env::prefixed("REPCOACH_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| CoachError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| CoachError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/repcoach/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("repcoach"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".repcoach")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path(config: &Config) {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:   {} {}", exists, global.display());
        } else {
            println!("  Global:   (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project:  {} {}", exists, project.display());

        let db = &config.storage.db_path;
        let exists = if db.exists() { "✓" } else { "✗" };
        println!("  Database: {} {}", exists, db.display());
    }

    /// Render the effective configuration with secrets redacted
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        let shown = config.redacted();
        if as_json {
            Ok(serde_json::to_string_pretty(&shown)?)
        } else {
            toml::to_string_pretty(&shown).map_err(|e| CoachError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            CoachError::Config("Cannot determine global config directory".to_string())
        })?;
        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        Self::write_template(&config_path, GLOBAL_TEMPLATE, force)?;
        Ok(config_path)
    }

    /// Initialize project configuration under `root`
    pub fn init_project(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = root.join(Self::project_dir());
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        Self::write_template(&config_path, PROJECT_TEMPLATE, force)?;
        Ok(config_path)
    }

    fn write_template(path: &Path, content: &str, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }
        fs::write(path, content)?;
        info!("Created config: {}", path.display());
        Ok(())
    }
}

const GLOBAL_TEMPLATE: &str = r#"# repcoach global configuration
# User-wide defaults. Project settings in .repcoach/config.toml override these.

version = "1.0"

[monitor]
poll_interval_mins = 30
# utc_offset_minutes = -300

[delivery]
request_timeout_secs = 15
# voice_url = "wss://speech.example.com/stream"
# sms_gateway_url = "https://sms.example.com/send"
# Set the token through REPCOACH_DELIVERY__SMS_TOKEN rather than here.
"#;

const PROJECT_TEMPLATE: &str = r#"# repcoach project configuration

version = "1.0"

[storage]
db_path = ".repcoach/repcoach.db"

[monitor]
research_window_mins = 30
long_call_mins = 10
morning_hour = 10
midday_hour = 13
friday_hour = 15
end_of_day_hour = 17

[persona]
# seed = 42

# [[team.reps]]
# id = "rep-1"
# name = "Dana"
# phone = "+15550001"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_templates_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, PROJECT_TEMPLATE).unwrap();
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.monitor.long_call_mins, 10);

        fs::write(&path, GLOBAL_TEMPLATE).unwrap();
        ConfigLoader::load_from_file(&path).unwrap();
    }

    #[test]
    fn test_init_project_respects_force() {
        let dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(dir.path(), false).unwrap();
        assert!(path.exists());

        fs::write(&path, "version = \"custom\"\n").unwrap();
        ConfigLoader::init_project(dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::init_project(dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[monitor]"));
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[monitor]
long_call_mins = 15

[[team.reps]]
id = "rep-1"
name = "Dana"
phone = "+15550001"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.monitor.long_call_mins, 15);
        assert_eq!(config.monitor.poll_interval_mins, 30);
        assert_eq!(config.team.reps.len(), 1);
        assert_eq!(config.team.reps[0].phone.as_deref(), Some("+15550001"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[monitor]\nmorning_hour = 31\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_render_redacts() {
        let mut config = Config::default();
        config.delivery.sms_token = Some("tok-123".into());
        let json = ConfigLoader::render(&config, true).unwrap();
        assert!(!json.contains("tok-123"));
    }

    #[test]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("REPCOACH_PERSONA__SEED", "42");
        }
        let config = ConfigLoader::load_layers(None, &dir.path().join("missing.toml")).unwrap();
        unsafe {
            std::env::remove_var("REPCOACH_PERSONA__SEED");
        }
        assert_eq!(config.persona.seed, Some(42));
    }
}
