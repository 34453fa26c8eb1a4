use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repcoach::cli::commands::{self, OutputFormat};
use repcoach::persona::Mood;
use repcoach::types::Severity;

#[derive(Parser)]
#[command(name = "repcoach")]
#[command(
    version,
    about = "Real-time sales coaching engine that watches rep activity and talks back"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize repcoach in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Monitor the roster and coach from a live activity feed
    Run {
        #[arg(long, short, help = "NDJSON activity file ('-' or omitted for stdin)")]
        events: Option<PathBuf>,
        #[arg(long, help = "Exit when the input ends instead of waiting for Ctrl-C")]
        once: bool,
    },

    /// Manage the team roster
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Send a manual coaching directive
    Intervene {
        #[arg(help = "Rep id")]
        rep: String,
        #[arg(help = "Why you are stepping in (e.g. \"slow start\", \"closed a deal\")")]
        reason: String,
        #[arg(
            short,
            long,
            default_value = "high",
            help = "immediate, high or medium"
        )]
        severity: Severity,
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a rep's score, today's numbers and recent coaching
    Stats {
        rep: String,
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rank the team by score
    Leaderboard {
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Announce a random team challenge
    Challenge {
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Critique a call transcript without sending anything
    Analyze {
        #[arg(help = "Transcript file ('-' or omitted for stdin)")]
        file: Option<PathBuf>,
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a line of sales wisdom
    Wisdom {
        #[arg(long, help = "impressed, neutral, disappointed or angry")]
        mood: Option<Mood>,
    },

    /// List a rep's coaching sessions with delivery receipts
    Sessions {
        rep: String,
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show store, roster and channel health
    Status {
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TeamAction {
    /// Add or update a rep
    Add {
        id: String,
        name: String,
        #[arg(long, help = "E.164 phone number for SMS coaching")]
        phone: Option<String>,
    },
    /// Deactivate a rep; coaching history is kept
    Remove { id: String },
    /// List the roster
    List {
        #[arg(long, help = "Include deactivated reps")]
        all: bool,
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mrepcoach encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Run { events, once } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::run::run(events, once))?;
        }
        Commands::Team { action } => match action {
            TeamAction::Add { id, name, phone } => commands::team::add(id, name, phone)?,
            TeamAction::Remove { id } => commands::team::remove(&id)?,
            TeamAction::List { all, format } => commands::team::list(format, all)?,
        },
        Commands::Intervene {
            rep,
            reason,
            severity,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::coach::intervene(&rep, &reason, severity, format))?;
        }
        Commands::Stats { rep, format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::coach::stats(&rep, format))?;
        }
        Commands::Leaderboard { format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::coach::leaderboard(format))?;
        }
        Commands::Challenge { format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::coach::challenge(format))?;
        }
        Commands::Analyze { file, format } => commands::analyze::run(file, format)?,
        Commands::Wisdom { mood } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::coach::wisdom(mood))?;
        }
        Commands::Sessions { rep, limit, format } => {
            commands::coach::sessions(&rep, limit, format)?
        }
        Commands::Status { format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::status::run(format))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?;
                } else {
                    commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
