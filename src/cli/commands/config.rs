//! Config Command
//!
//! Usage:
//!   repcoach config show [-f json]
//!   repcoach config path
//!   repcoach config init [-g] [--force]

use super::OutputFormat;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration, secrets redacted
pub fn show(format: OutputFormat) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, format.is_json())?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let config = ConfigLoader::load()?;
    ConfigLoader::show_path(&config);
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let path = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Config: {}", path.display());
    Ok(())
}

/// Initialize project configuration
pub fn init_project(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let path = ConfigLoader::init_project(&root, force)?;
    println!("✓ Initialized project configuration");
    println!("  Config: {}", path.display());
    Ok(())
}
