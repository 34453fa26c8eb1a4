//! Phrase tables for the coach persona.
//!
//! Each category has a default list and optional named variants. The
//! generator resolves a variant by subcategory first, then by mood
//! (`harsh` for angry, `supportive`/`qualified` for impressed).

/// Category names accepted by the generator
pub mod category {
    pub const MORNING: &str = "morning";
    pub const SLOW_START: &str = "slow_start";
    pub const NO_RESEARCH: &str = "no_research";
    pub const POST_CALL: &str = "post_call";
    pub const LONG_CALL: &str = "long_call";
    pub const CLOSER: &str = "closer";
    pub const PIPELINE_STALL: &str = "pipeline_stall";
    pub const END_OF_DAY: &str = "end_of_day";
    pub const FRIDAY: &str = "friday";
    pub const LEADERBOARD: &str = "leaderboard";
    pub const WISDOM: &str = "wisdom";
    pub const CHALLENGE: &str = "challenge";
    pub const SIGNATURE: &str = "signature";
}

/// Returned when a category has no table
pub const FALLBACK_MESSAGE: &str = "Stay sharp. Winners don't wait for permission.";

pub struct PhraseTable {
    pub default: &'static [&'static str],
    pub variants: &'static [(&'static str, &'static [&'static str])],
}

impl PhraseTable {
    pub fn variant(&self, name: &str) -> Option<&'static [&'static str]> {
        self.variants
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, phrases)| *phrases)
            .filter(|phrases| !phrases.is_empty())
    }
}

pub fn table(category: &str) -> Option<&'static PhraseTable> {
    match category {
        category::MORNING => Some(&MORNING),
        category::SLOW_START => Some(&SLOW_START),
        category::NO_RESEARCH => Some(&NO_RESEARCH),
        category::POST_CALL => Some(&POST_CALL),
        category::LONG_CALL => Some(&LONG_CALL),
        category::CLOSER => Some(&CLOSER),
        category::PIPELINE_STALL => Some(&PIPELINE_STALL),
        category::END_OF_DAY => Some(&END_OF_DAY),
        category::FRIDAY => Some(&FRIDAY),
        category::LEADERBOARD => Some(&LEADERBOARD),
        category::WISDOM => Some(&WISDOM),
        category::CHALLENGE => Some(&CHALLENGE),
        category::SIGNATURE => Some(&SIGNATURE),
        _ => None,
    }
}

static MORNING: PhraseTable = PhraseTable {
    default: &[
        "{name}, it's {calls} calls in. The day doesn't wait for you to feel ready. Dial.",
        "Good morning, {name}. {calls} calls so far. Champions are already on their fifth conversation.",
        "{calls} dials before ten, {name}? Pick up the phone and make the morning count.",
    ],
    variants: &[
        (
            "harsh",
            &[
                "{calls} calls, {name}. {calls}. I've seen interns with more hustle. Get on the phone now.",
                "{name}, {calls} calls by ten is not a warm-up, it's a warning. Dial.",
            ],
        ),
        (
            "supportive",
            &[
                "{name}, only {calls} calls so far, but you've earned some trust. Now earn the morning.",
            ],
        ),
    ],
};

static SLOW_START: PhraseTable = PhraseTable {
    default: &[
        "{name}, {calls} calls and the clock is running. Ten before two. No excuses.",
        "You're at {calls} calls, {name}. The pipeline doesn't fill itself.",
    ],
    variants: &[
        (
            "harsh",
            &[
                "{calls} calls, {name}? Half the day is gone. Stop planning and start dialing.",
                "I don't pay attention to effort, {name}. I pay attention to {calls} calls. Fix it.",
            ],
        ),
        (
            "midday",
            &[
                "It's one o'clock, {name}, and you have {calls} calls. The afternoon decides who you are.",
            ],
        ),
    ],
};

static NO_RESEARCH: PhraseTable = PhraseTable {
    default: &[
        "You're dialing blind, {name}. Two minutes of research beats twenty minutes of guessing.",
        "{name}, you picked up the phone without knowing who's on the other end. Never again.",
    ],
    variants: &[(
        "harsh",
        &["Dialing without research is amateur hour, {name}. Look them up before you waste their time and mine."],
    )],
};

static POST_CALL: PhraseTable = PhraseTable {
    default: &[
        "That call got away, {name}. Here's why, and here's how you fix it.",
        "{name}, a no-decision is a decision you let them make. Let's look at the tape.",
    ],
    variants: &[
        (
            "harsh",
            &["{name}, that wasn't a sales call, it was a conversation. Learn the difference."],
        ),
        (
            "weak_opening",
            &["You opened with an apology, {name}. Never apologise for calling. Lead with value."],
        ),
        (
            "no_pain_discovery",
            &["You pitched before you found the pain, {name}. Ask what's broken before you sell the fix."],
        ),
        (
            "no_close_attempt",
            &["You never asked for the business, {name}. If you don't ask, the answer is always no."],
        ),
        (
            "qualified",
            &["Good call structure, {name}. It didn't land this time. Tighten the close and go again."],
        ),
    ],
};

static LONG_CALL: PhraseTable = PhraseTable {
    default: &[
        "Over ten minutes and no close, {name}. Long calls without a decision are expensive friendships.",
        "{name}, if it takes ten minutes and they still haven't said yes, you're not selling, you're chatting.",
    ],
    variants: &[],
};

static CLOSER: PhraseTable = PhraseTable {
    default: &[
        "That's a close, {name}. Now do it again before the feeling wears off.",
        "Closed. That's what I like to see, {name}. {closes} today and counting.",
    ],
    variants: &[
        (
            "supportive",
            &[
                "{name}, that's {closes} today. You're not lucky, you're good. Keep the momentum.",
                "Beautiful close, {name}. Score {score} and climbing.",
            ],
        ),
        (
            "harsh",
            &["One close, {name}. Finally. Don't celebrate, replicate."],
        ),
    ],
};

static PIPELINE_STALL: PhraseTable = PhraseTable {
    default: &[
        "{name}, {opportunities} opportunities and zero closes. You're collecting maybes. Convert one now.",
        "{opportunities} follow-ups open, {name}, and nothing closed. Pick the hottest one and ask for the deal.",
    ],
    variants: &[(
        "harsh",
        &["{opportunities} open opportunities and not one close, {name}. Stop nurturing and start closing."],
    )],
};

static END_OF_DAY: PhraseTable = PhraseTable {
    default: &[
        "Average day, {name}. {closes} closes from {calls} calls. Average doesn't get a corner office.",
    ],
    variants: &[
        (
            "praise",
            &[
                "{closes} closes today, {name}. That's how it's done. Tomorrow, do it again.",
                "{name}, {closes} deals. You earned tonight. Rest, then come back hungry.",
            ],
        ),
        (
            "harsh",
            &[
                "Zero closes, {name}. {calls} calls and nothing to show. Tomorrow is not optional.",
                "{name}, the scoreboard says zero. I don't grade on effort.",
            ],
        ),
        (
            "average",
            &[
                "{closes} closes from {calls} calls, {name}. Respectable. Respectable doesn't win.",
                "Middle of the pack today, {name}. {closes} closes. Find the extra gear tomorrow.",
            ],
        ),
    ],
};

static FRIDAY: PhraseTable = PhraseTable {
    default: &[
        "It's Friday at three, {name}. Everyone else is mentally gone. That's your advantage. Dial.",
        "Friday afternoon, {name}. Close one more before the weekend and enjoy it properly.",
    ],
    variants: &[],
};

static LEADERBOARD: PhraseTable = PhraseTable {
    default: &["You're in the race, {name}. Now win it."],
    variants: &[
        ("first", &["Top of the board, {name}. Now defend it."]),
        ("last", &["Last place, {name}. Everyone's watching what you do next."]),
    ],
};

static WISDOM: PhraseTable = PhraseTable {
    default: &[
        "Winners don't make excuses when the other side plays the game.",
        "When you're backed against the wall, break the damn thing down.",
        "Work until you no longer have to introduce yourself.",
        "Don't have dreams, have goals.",
        "The only time success comes before work is in the dictionary.",
    ],
    variants: &[
        (
            "harsh",
            &[
                "I don't have time for people who don't have time.",
                "Nobody remembers second place.",
            ],
        ),
        (
            "supportive",
            &[
                "Keep your head up. Confidence closes.",
                "You're doing the work. The numbers will follow.",
            ],
        ),
    ],
};

static CHALLENGE: PhraseTable = PhraseTable {
    default: &[
        "New challenge, {name}. Take it or watch someone else take the credit.",
        "{name}, here's your challenge. Winners don't negotiate with the target.",
    ],
    variants: &[],
};

static SIGNATURE: PhraseTable = PhraseTable {
    default: &[
        "That's all. Now go close something.",
        "Clock's ticking. Get back to it.",
    ],
    variants: &[],
};
