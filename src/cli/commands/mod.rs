//! Command handlers invoked from `main.rs`

pub mod analyze;
pub mod coach;
pub mod config;
pub mod init;
pub mod run;
pub mod status;
pub mod team;

/// `-f/--format` values shared by the reporting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> crate::types::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
