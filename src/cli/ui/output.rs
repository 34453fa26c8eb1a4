use console::{StyledObject, style};

use crate::persona::Mood;
use crate::types::{DeliveryOutcome, Severity};

/// Terminal styling for coaching output
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Immediate stands out, medium stays quiet
    pub fn severity(severity: Severity) -> StyledObject<&'static str> {
        let text = style(severity.as_str());
        match severity {
            Severity::Immediate => text.red().bold(),
            Severity::High => text.yellow(),
            Severity::Medium => text.cyan(),
        }
    }

    pub fn mood(mood: Mood) -> StyledObject<&'static str> {
        let text = style(mood.as_str());
        match mood {
            Mood::Impressed => text.green(),
            Mood::Neutral => text,
            Mood::Disappointed => text.yellow(),
            Mood::Angry => text.red().bold(),
        }
    }

    /// Score colored by the mood it puts the coach in
    pub fn score(score: u8) -> StyledObject<String> {
        let text = style(score.to_string()).bold();
        match Mood::from_score(score) {
            Mood::Impressed => text.green(),
            Mood::Neutral => text,
            Mood::Disappointed => text.yellow(),
            Mood::Angry => text.red(),
        }
    }

    pub fn outcome(outcome: DeliveryOutcome) -> StyledObject<&'static str> {
        let text = style(outcome.as_str());
        match outcome {
            DeliveryOutcome::Delivered => text.green(),
            DeliveryOutcome::Failed => text.red(),
        }
    }

    pub fn check(passed: bool) -> StyledObject<&'static str> {
        if passed {
            style("✓").green()
        } else {
            style("✗").red()
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_keep_plain_text() {
        console::set_colors_enabled(false);
        assert_eq!(Output::severity(Severity::Immediate).to_string(), "immediate");
        assert_eq!(Output::mood(Mood::Angry).to_string(), "angry");
        assert_eq!(Output::score(42).to_string(), "42");
        assert_eq!(Output::outcome(DeliveryOutcome::Failed).to_string(), "failed");
        assert_eq!(Output::check(false).to_string(), "✗");
    }
}
