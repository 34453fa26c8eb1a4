//! Transcript Critique Analyzer
//!
//! Keyword/pattern classification of a call transcript into four checks and
//! a single weakest point. No language understanding: presence tests only.
//!
//! Weakest-point priority is fixed: opening, then pain discovery, then close.
//! Objection handling is reported but never chosen as the weakest point.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stock apologies and hesitations that make an opening weak
static WEAK_OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(sorry to (bother|disturb|interrupt)|is (this|now) a (good|bad) time|um+|uh+|just (calling|checking) (to|in)|i was wondering if|hope i'?m not (bothering|interrupting)|do you have a (minute|second))\b",
    )
    .expect("weak opening pattern is valid")
});

static PAIN_DISCOVERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(challenges?|problems?|struggl\w*|pain( points?)?|frustrat\w*|difficult\w*|issues?|bottlenecks?|costing you|keeps? you up)\b",
    )
    .expect("pain discovery pattern is valid")
});

static OBJECTION_HANDLING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(because|that'?s why|which means|the reason|so that|i understand your concern|i hear you|what if)\b",
    )
    .expect("objection handling pattern is valid")
});

static CLOSE_ATTEMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(sign( up)?|contract|next steps?|schedule|calendar|move forward|get (you )?started|agreement|start date|ready to (buy|commit)|close the deal)\b",
    )
    .expect("close attempt pattern is valid")
});

/// Dimension a critique focuses on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakPoint {
    WeakOpening,
    NoPainDiscovery,
    NoCloseAttempt,
    None,
}

impl WeakPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeakPoint::WeakOpening => "weak_opening",
            WeakPoint::NoPainDiscovery => "no_pain_discovery",
            WeakPoint::NoCloseAttempt => "no_close_attempt",
            WeakPoint::None => "none",
        }
    }
}

impl std::fmt::Display for WeakPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnalysis {
    pub has_strong_opening: bool,
    pub discovered_pain: bool,
    pub handled_objections: bool,
    pub attempted_close: bool,
    pub weakest_point: WeakPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCritique {
    pub message: String,
    pub suggestions: Vec<String>,
}

pub fn analyze(transcript: &str) -> CallAnalysis {
    let has_strong_opening = !WEAK_OPENING.is_match(transcript);
    let discovered_pain = PAIN_DISCOVERY.is_match(transcript);
    let handled_objections = OBJECTION_HANDLING.is_match(transcript);
    let attempted_close = CLOSE_ATTEMPT.is_match(transcript);

    let weakest_point = if !has_strong_opening {
        WeakPoint::WeakOpening
    } else if !discovered_pain {
        WeakPoint::NoPainDiscovery
    } else if !attempted_close {
        WeakPoint::NoCloseAttempt
    } else {
        WeakPoint::None
    };

    CallAnalysis {
        has_strong_opening,
        discovered_pain,
        handled_objections,
        attempted_close,
        weakest_point,
    }
}

pub fn generate_call_critique(analysis: &CallAnalysis) -> CallCritique {
    let (message, suggestions): (&str, &[&str]) = match analysis.weakest_point {
        WeakPoint::WeakOpening => (
            "Your opening was weak. You asked for permission instead of earning attention.",
            &[
                "Try: \"I'm calling because companies like yours are losing deals to slow follow-up. Is that on your radar?\"",
                "Open with their problem, not your apology.",
            ],
        ),
        WeakPoint::NoPainDiscovery => (
            "You never found the pain. No pain, no urgency, no deal.",
            &[
                "Ask: \"What's the biggest challenge your team is facing with this right now?\"",
                "Follow up with: \"What is that costing you each month?\"",
            ],
        ),
        WeakPoint::NoCloseAttempt => (
            "You never asked for the business. They can't say yes to a question you didn't ask.",
            &["Try: \"Based on what you've told me, does it make sense to get you started this week?\""],
        ),
        WeakPoint::None => (
            "Solid structure. The fundamentals were there; sharpen the delivery.",
            &["Lock the next step on the calendar before you hang up."],
        ),
    };

    CallCritique {
        message: message.to_string(),
        suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
    }
}
