//! Persona Response Generator
//!
//! Maps (category, subcategory, mood) to one rendered coach message.
//!
//! ## Selection
//!
//! 1. Look up the phrase table for the category (unknown → fallback text)
//! 2. A matching subcategory variant wins
//! 3. Otherwise `harsh` when angry, `supportive`/`qualified` when impressed
//! 4. Otherwise the category's default list
//!
//! The pick inside the resolved list is uniform. Randomness comes from an
//! injected RNG so seeded generators reproduce the same output.

pub mod phrases;

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::score::mood as breakpoints;
pub use phrases::{FALLBACK_MESSAGE, category};

/// Coach attitude derived from a rep's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Impressed,
    Neutral,
    Disappointed,
    Angry,
}

impl Mood {
    /// Breakpoints are inclusive to the higher tier.
    pub fn from_score(score: u8) -> Self {
        if score >= breakpoints::IMPRESSED {
            Mood::Impressed
        } else if score >= breakpoints::NEUTRAL {
            Mood::Neutral
        } else if score >= breakpoints::DISAPPOINTED {
            Mood::Disappointed
        } else {
            Mood::Angry
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Impressed => "impressed",
            Mood::Neutral => "neutral",
            Mood::Disappointed => "disappointed",
            Mood::Angry => "angry",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "impressed" => Ok(Mood::Impressed),
            "neutral" => Ok(Mood::Neutral),
            "disappointed" => Ok(Mood::Disappointed),
            "angry" => Ok(Mood::Angry),
            _ => Err(format!(
                "Unknown mood: {}. Valid values: impressed, neutral, disappointed, angry",
                s
            )),
        }
    }
}

/// Values substituted into phrase placeholders
#[derive(Debug, Clone, Default)]
pub struct PhraseContext {
    pub rep_name: Option<String>,
    pub calls: u32,
    pub closes: u32,
    pub opportunities: u32,
    pub score: u8,
}

impl PhraseContext {
    pub fn for_rep(name: impl Into<String>) -> Self {
        Self {
            rep_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, calls: u32, opportunities: u32, closes: u32) -> Self {
        self.calls = calls;
        self.opportunities = opportunities;
        self.closes = closes;
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = score;
        self
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("{name}", self.rep_name.as_deref().unwrap_or("champ"))
            .replace("{calls}", &self.calls.to_string())
            .replace("{closes}", &self.closes.to_string())
            .replace("{opportunities}", &self.opportunities.to_string())
            .replace("{score}", &self.score.to_string())
    }
}

/// Thread-safe persona generator with a pluggable random source
pub struct PersonaGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl std::fmt::Debug for PersonaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaGenerator").finish_non_exhaustive()
    }
}

impl PersonaGenerator {
    /// Generator backed by any RNG
    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// OS-seeded generator for production
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Seeded when a seed is configured, OS-seeded otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_os_rng)
    }

    /// Render one message. Unknown categories return [`FALLBACK_MESSAGE`].
    pub fn generate(
        &self,
        category: &str,
        subcategory: Option<&str>,
        mood: Mood,
        context: &PhraseContext,
    ) -> String {
        let Some(table) = phrases::table(category) else {
            tracing::debug!(category, "Unknown persona category, using fallback");
            return FALLBACK_MESSAGE.to_string();
        };

        let candidates = resolve(table, subcategory, mood);
        match self.choose(candidates) {
            Some(template) => context.render(template),
            None => FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Uniform pick from a slice
    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..items.len()),
            Err(poisoned) => poisoned.into_inner().random_range(0..items.len()),
        };
        items.get(idx)
    }
}

fn resolve(
    table: &'static phrases::PhraseTable,
    subcategory: Option<&str>,
    mood: Mood,
) -> &'static [&'static str] {
    if let Some(list) = subcategory.and_then(|sub| table.variant(sub)) {
        return list;
    }

    let by_mood = match mood {
        Mood::Angry => table.variant("harsh"),
        Mood::Impressed => table
            .variant("supportive")
            .or_else(|| table.variant("qualified")),
        _ => None,
    };

    by_mood.unwrap_or(table.default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mood_breakpoints() {
        assert_eq!(Mood::from_score(100), Mood::Impressed);
        assert_eq!(Mood::from_score(80), Mood::Impressed);
        assert_eq!(Mood::from_score(79), Mood::Neutral);
        assert_eq!(Mood::from_score(60), Mood::Neutral);
        assert_eq!(Mood::from_score(59), Mood::Disappointed);
        assert_eq!(Mood::from_score(40), Mood::Disappointed);
        assert_eq!(Mood::from_score(39), Mood::Angry);
        assert_eq!(Mood::from_score(0), Mood::Angry);
    }

    proptest! {
        #[test]
        fn mood_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
            let rank = |m: Mood| match m {
                Mood::Angry => 0,
                Mood::Disappointed => 1,
                Mood::Neutral => 2,
                Mood::Impressed => 3,
            };
            if a <= b {
                prop_assert!(rank(Mood::from_score(a)) <= rank(Mood::from_score(b)));
            }
        }
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let persona = PersonaGenerator::seeded(7);
        let msg = persona.generate("karaoke", None, Mood::Neutral, &PhraseContext::default());
        assert_eq!(msg, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let ctx = PhraseContext::for_rep("Dana").with_counts(3, 0, 0);
        let a = PersonaGenerator::seeded(42);
        let b = PersonaGenerator::seeded(42);
        for _ in 0..10 {
            assert_eq!(
                a.generate(category::WISDOM, None, Mood::Neutral, &ctx),
                b.generate(category::WISDOM, None, Mood::Neutral, &ctx)
            );
        }
    }

    #[test]
    fn test_subcategory_wins_over_mood() {
        let persona = PersonaGenerator::seeded(1);
        let ctx = PhraseContext::for_rep("Dana");
        let msg = persona.generate(category::POST_CALL, Some("weak_opening"), Mood::Angry, &ctx);
        assert!(msg.contains("apologise"));
    }

    #[test]
    fn test_angry_uses_harsh_variant() {
        let persona = PersonaGenerator::seeded(3);
        let ctx = PhraseContext::for_rep("Dana");
        let harsh = phrases::table(category::NO_RESEARCH)
            .unwrap()
            .variant("harsh")
            .unwrap();
        let msg = persona.generate(category::NO_RESEARCH, None, Mood::Angry, &ctx);
        assert!(harsh.iter().any(|t| ctx.render(t) == msg));
    }

    #[test]
    fn test_impressed_uses_qualified_when_no_supportive() {
        let persona = PersonaGenerator::seeded(5);
        let ctx = PhraseContext::for_rep("Dana");
        let msg = persona.generate(category::POST_CALL, None, Mood::Impressed, &ctx);
        assert!(msg.starts_with("Good call structure"));
    }

    #[test]
    fn test_unknown_subcategory_uses_default() {
        let persona = PersonaGenerator::seeded(9);
        let ctx = PhraseContext::for_rep("Dana");
        let msg = persona.generate(category::LONG_CALL, Some("nope"), Mood::Neutral, &ctx);
        let defaults = phrases::table(category::LONG_CALL).unwrap().default;
        assert!(defaults.iter().any(|t| ctx.render(t) == msg));
    }

    #[test]
    fn test_placeholders_render() {
        let ctx = PhraseContext::default().with_counts(3, 6, 0).with_score(42);
        let rendered = ctx.render("{name}: {calls}/{opportunities}/{closes} @ {score}");
        assert_eq!(rendered, "champ: 3/6/0 @ 42");
    }

    #[test]
    fn test_choose_empty() {
        let persona = PersonaGenerator::seeded(0);
        let empty: [u8; 0] = [];
        assert!(persona.choose(&empty).is_none());
    }
}
