//! Team Command
//!
//! Roster management. Reps added here are picked up by `repcoach run`.

use console::style;

use super::{OutputFormat, print_json};
use crate::cli::CommandContext;
use crate::types::{CoachError, RepId, RepIdentity, Result};

pub fn add(id: String, name: String, phone: Option<String>) -> Result<()> {
    if id.trim().is_empty() {
        return Err(CoachError::InvalidInput("rep id must not be empty".into()));
    }
    let ctx = CommandContext::load()?;
    let mut rep = RepIdentity::new(id, name);
    rep.phone = phone;

    ctx.store.upsert_reps(std::slice::from_ref(&rep))?;
    println!("✓ Added {} ({})", rep.name, rep.id);
    Ok(())
}

pub fn remove(id: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let rep_id = RepId::new(id);
    if !ctx.store.set_rep_active(&rep_id, false)? {
        return Err(CoachError::not_found(&rep_id));
    }
    println!("✓ Removed {} (history kept)", rep_id);
    Ok(())
}

pub fn list(format: OutputFormat, all: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let reps = if all {
        ctx.store.list_reps(false)?
    } else {
        ctx.roster()?
    };

    if format.is_json() {
        return print_json(&reps);
    }
    if reps.is_empty() {
        println!("No reps yet. Add one with 'repcoach team add <id> <name>'.");
        return Ok(());
    }
    for rep in &reps {
        println!(
            "  {:<16} {:<24} {}",
            style(&rep.id).bold(),
            rep.name,
            rep.phone.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
