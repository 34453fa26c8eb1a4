//! One-shot coaching commands
//!
//! Each command brings the team up, does one thing, and shuts it down so
//! deliveries in flight finish before the process exits.

use console::style;

use super::{OutputFormat, print_json};
use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::persona::Mood;
use crate::types::{RepId, Result, Severity};

pub async fn intervene(
    rep_id: &str,
    reason: &str,
    severity: Severity,
    format: OutputFormat,
) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.start_team().await?;
    let result = team.intervene(&RepId::new(rep_id), reason, severity).await;
    team.shutdown().await;
    let session = result?;

    if format.is_json() {
        let outcome = ctx.store.session_outcome(&session.id)?;
        return print_json(&serde_json::json!({
            "session": session,
            "delivery": outcome.as_str(),
        }));
    }

    let out = Output::new();
    out.success(&format!(
        "{} directive ({}) sent to {}",
        session.mode,
        Output::severity(session.severity),
        session.rep_id
    ));
    println!("  {}", session.message);
    match ctx.store.session_outcome(&session.id)? {
        crate::types::DeliveryOutcome::Delivered => {}
        crate::types::DeliveryOutcome::Failed => {
            out.warning("Every channel failed; see 'repcoach sessions' for receipts")
        }
    }
    Ok(())
}

pub async fn stats(rep_id: &str, format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.start_team().await?;
    let result = team.get_rep_stats(&RepId::new(rep_id)).await;
    team.shutdown().await;
    let stats = result?;

    if format.is_json() {
        return print_json(&stats);
    }

    let out = Output::new();
    out.header(&format!("{} ({})", stats.rep.name, stats.rep.id));
    println!(
        "Score:         {} ({})",
        Output::score(stats.score),
        Output::mood(stats.mood)
    );
    println!("Status:        {}", stats.status);
    println!("Calls today:   {}", stats.today.calls_today);
    println!("Connected:     {}", stats.today.calls_connected);
    println!("Opportunities: {}", stats.today.opportunities_today);
    println!("Closed:        {}", stats.today.closed_today);
    println!("Close rate:    {:.0}%", stats.today.close_rate * 100.0);

    if !stats.recent_sessions.is_empty() {
        out.section("Recent coaching");
        for session in &stats.recent_sessions {
            println!(
                "  {} {:<22} {}",
                session.created_at.format("%H:%M"),
                session.mode.to_string(),
                session.message
            );
        }
    }
    Ok(())
}

pub async fn leaderboard(format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.start_team().await?;
    let result = team.get_leaderboard().await;
    team.shutdown().await;
    let board = result?;

    if format.is_json() {
        return print_json(&board);
    }
    if board.is_empty() {
        println!("Nobody on the board yet.");
        return Ok(());
    }
    Output::new().header("Leaderboard");
    for entry in &board {
        println!(
            "  {:>2}. {:<16} {:>3}  {}",
            entry.rank,
            style(&entry.rep_id).bold(),
            Output::score(entry.score),
            style(&entry.commentary).dim()
        );
    }
    Ok(())
}

pub async fn challenge(format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.orchestrator()?;
    let challenge = team.create_challenge().await;

    if format.is_json() {
        return print_json(&challenge);
    }
    Output::new().header(&challenge.title);
    println!("{} (target: {})", challenge.goal, challenge.target);
    println!("Ends: {}", challenge.ends_at.format("%Y-%m-%d %H:%M UTC"));
    println!();
    println!("{}", challenge.pitch);
    Ok(())
}

pub async fn wisdom(mood: Option<Mood>) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.orchestrator()?;
    println!("{}", team.get_wisdom(mood).await);
    Ok(())
}

/// Coaching audit trail for one rep, folding in transport receipts
pub fn sessions(rep_id: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let ctx = CommandContext::load()?;
    let rep_id = RepId::new(rep_id);
    let sessions = ctx.store.sessions_for_rep(&rep_id, limit)?;

    let mut rows = Vec::with_capacity(sessions.len());
    for session in sessions {
        let receipts = ctx.store.receipts_for_session(&session.id)?;
        let outcome = ctx.store.session_outcome(&session.id)?;
        rows.push((session, outcome, receipts));
    }

    if format.is_json() {
        let json: Vec<_> = rows
            .iter()
            .map(|(session, outcome, receipts)| {
                serde_json::json!({
                    "session": session,
                    "delivery": outcome.as_str(),
                    "receipts": receipts,
                })
            })
            .collect();
        return print_json(&json);
    }

    if rows.is_empty() {
        println!("No coaching sessions for {}.", rep_id);
        return Ok(());
    }
    for (session, outcome, receipts) in &rows {
        let channels: Vec<String> = receipts
            .iter()
            .map(|r| format!("{}:{}", r.channel, r.status.as_str()))
            .collect();
        println!(
            "{} {:<20} {:<9} {:<9} [{}]",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.mode.to_string(),
            Output::severity(session.severity),
            Output::outcome(*outcome),
            channels.join(", ")
        );
        println!("    {}", style(&session.message).dim());
    }
    Ok(())
}
