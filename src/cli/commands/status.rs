//! Status Command
//!
//! Store reachability, roster size and delivery circuit state.

use crate::cli::{CommandContext, is_initialized};
use crate::config::ConfigLoader;
use crate::types::Result;

use super::{OutputFormat, print_json};

pub async fn run(format: OutputFormat) -> Result<()> {
    let config = ConfigLoader::load()?;
    if !is_initialized(&config) {
        if format.is_json() {
            println!("{{\"status\": \"not_initialized\"}}");
        } else {
            println!("repcoach Status");
            println!("══════════════════════════════════════");
            println!("Not initialized. Run 'repcoach init' first.");
        }
        // Informational only
        return Ok(());
    }

    let ctx = CommandContext::load()?;
    let team = ctx.start_team().await?;
    let health = team.health_check().await;
    team.shutdown().await;

    if format.is_json() {
        return print_json(&serde_json::json!({
            "status": if health.is_healthy() { "healthy" } else { "degraded" },
            "database": config.storage.db_path,
            "health": health,
        }));
    }

    println!("repcoach Status");
    println!("══════════════════════════════════════");
    println!("Database: {}", config.storage.db_path.display());
    println!("Store:    {}", if health.store_ok { "reachable" } else { "UNREACHABLE" });
    println!("Reps:     {}", health.monitored);
    println!();
    println!("Channels:");
    for circuit in &health.circuits {
        println!(
            "  {:<8} {:<10} failures={} blocked={}",
            circuit.channel, circuit.state.to_string(), circuit.failure_count, circuit.blocked_count
        );
    }
    if !health.unhealthy.is_empty() {
        println!();
        println!("Unhealthy reps:");
        for rep in &health.unhealthy {
            println!(
                "  {} {} {}",
                rep.rep_id,
                rep.health.status,
                rep.health.last_error.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}
