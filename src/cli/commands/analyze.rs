//! Analyze Command
//!
//! Scores a call transcript offline. Nothing is delivered or stored.

use std::path::PathBuf;

use console::style;

use super::{OutputFormat, print_json};
use crate::cli::ui::Output;
use crate::cli::util::read_input;
use crate::critique::CallAnalysis;
use crate::team::CallReview;
use crate::types::{CoachError, Result};

pub fn run(file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let transcript = read_input(file.as_ref())?;
    if transcript.trim().is_empty() {
        return Err(CoachError::InvalidInput("transcript is empty".into()));
    }

    let review = CallReview::of(&transcript);
    if format.is_json() {
        return print_json(&review);
    }

    println!("{}", style("Call Analysis").bold().underlined());
    print_checks(&review.analysis);
    println!();
    println!("Weakest point: {}", style(review.analysis.weakest_point).yellow());
    println!();
    println!("{}", review.critique.message);
    for suggestion in &review.critique.suggestions {
        println!("  • {}", suggestion);
    }
    Ok(())
}

fn print_checks(analysis: &CallAnalysis) {
    let rows = [
        ("Strong opening", analysis.has_strong_opening),
        ("Pain discovered", analysis.discovered_pain),
        ("Objections handled", analysis.handled_objections),
        ("Close attempted", analysis.attempted_close),
    ];
    for (label, passed) in rows {
        println!("  {} {}", Output::check(passed), label);
    }
}
