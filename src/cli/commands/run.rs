//! Run Command
//!
//! Starts a monitor for every rep on the roster and feeds it activity read
//! as newline-delimited JSON from a file or stdin. Two record shapes are
//! accepted per line:
//!
//! ```text
//! {"rep_id":"r1","kind":"call_ended","call_id":"c9","outcome":"unsuccessful",
//!  "duration_secs":420,"created_at":"2025-03-14T15:04:05Z"}
//! {"rep_id":"r1","contact_id":"acme-42","researched_at":"2025-03-14T14:50:00Z"}
//! ```
//!
//! Ctrl-C stops every monitor and waits for in-flight deliveries.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::team::TeamOrchestrator;
use crate::types::{ActivityEvent, CoachError, RepId, Result};

/// CRM research entry preceding a call
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchRecord {
    pub rep_id: RepId,
    pub contact_id: String,
    #[serde(default)]
    pub researched_at: Option<DateTime<Utc>>,
}

/// One line of the activity feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundRecord {
    Activity(ActivityEvent),
    Research(ResearchRecord),
}

pub fn parse_line(line: &str) -> Result<InboundRecord> {
    serde_json::from_str(line)
        .map_err(|e| CoachError::InvalidInput(format!("unrecognized activity record: {}", e)))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct IngestCounts {
    events: usize,
    research: usize,
    skipped: usize,
}

pub async fn run(events: Option<PathBuf>, exit_on_eof: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let team = ctx.start_team().await?;
    let out = Output::new();

    let monitored = team.monitored();
    if monitored.is_empty() {
        out.warning("No reps on the roster; events will be stored but nobody is coached");
    } else {
        out.info(&format!("Monitoring {} reps", monitored.len()));
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &events {
        Some(path) if path.as_os_str() != "-" => {
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();
    let mut counts = IngestCounts::default();
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => ingest(&team, ctx.clock.now_utc(), &line, &mut counts).await,
                Ok(None) => {
                    input_open = false;
                    info!(events = counts.events, research = counts.research, skipped = counts.skipped, "Activity input finished");
                    if exit_on_eof {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Activity input failed");
                    input_open = false;
                    if exit_on_eof {
                        break;
                    }
                }
            },
        }
    }

    for rep in &monitored {
        if let Err(e) = team.flush(&rep.id).await {
            debug!(rep_id = %rep.id, error = %e, "Monitor already stopped");
        }
    }
    team.shutdown().await;

    out.success(&format!(
        "Processed {} events and {} research records ({} skipped)",
        counts.events, counts.research, counts.skipped
    ));
    Ok(())
}

async fn ingest(team: &TeamOrchestrator, now: DateTime<Utc>, line: &str, counts: &mut IngestCounts) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }

    let result = match parse_line(line) {
        Ok(InboundRecord::Activity(event)) => {
            counts.events += 1;
            team.publish(event).await
        }
        Ok(InboundRecord::Research(record)) => {
            counts.research += 1;
            team.bus().publish_research(
                &record.rep_id,
                &record.contact_id,
                record.researched_at.unwrap_or(now),
            )
        }
        Err(e) => {
            counts.skipped += 1;
            warn!(error = %e, "Skipping activity line");
            return;
        }
    };

    if let Err(e) = result {
        warn!(error = %e, "Failed to record activity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallOutcome, EventKind};

    #[test]
    fn test_parse_call_event() {
        let record = parse_line(
            r#"{"rep_id":"r1","kind":"call_ended","call_id":"c9","outcome":"unsuccessful","duration_secs":420,"created_at":"2025-03-14T15:04:05Z"}"#,
        )
        .unwrap();
        let InboundRecord::Activity(event) = record else {
            panic!("expected activity, got {:?}", record);
        };
        assert_eq!(event.kind, EventKind::CallEnded);
        assert_eq!(event.outcome, Some(CallOutcome::Unsuccessful));
        assert_eq!(event.duration_secs, Some(420));
    }

    #[test]
    fn test_parse_research_record() {
        let record = parse_line(r#"{"rep_id":"r1","contact_id":"acme-42"}"#).unwrap();
        assert_eq!(
            record,
            InboundRecord::Research(ResearchRecord {
                rep_id: RepId::new("r1"),
                contact_id: "acme-42".into(),
                researched_at: None,
            })
        );
    }

    #[test]
    fn test_malformed_call_is_not_mistaken_for_research() {
        // Bad kind plus extra fields must not fall through to the research shape
        let line = r#"{"rep_id":"r1","contact_id":"c","kind":"call_paused","call_id":"c1","created_at":"2025-03-14T15:04:05Z"}"#;
        assert!(parse_line(line).is_err());
        assert!(parse_line("not json").is_err());
    }
}
