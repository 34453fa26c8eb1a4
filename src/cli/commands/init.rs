//! Init Command
//!
//! Initialize repcoach in the current directory.

use crate::cli::util::create_database;
use crate::config::ConfigLoader;
use crate::types::{CoachError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let project_dir = root.join(ConfigLoader::project_dir());

    if project_dir.exists() && !force {
        return Err(CoachError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    let config_path = ConfigLoader::init_project(&root, force)?;

    // Never overwrite the user's global config from here
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let config = ConfigLoader::load()?;
    create_database(&config.storage.db_path, &config)?;

    println!("✓ Initialized repcoach in {}/", ConfigLoader::project_dir().display());
    println!("  Config:   {}", config_path.display());
    println!("  Database: {}", config.storage.db_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Add reps with 'repcoach team add <id> <name> --phone <number>'");
    println!("  2. Stream activity with 'repcoach run --events calls.ndjson'");

    Ok(())
}
