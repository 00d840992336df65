//! Lookup of the final mood for a pair of independently classified emotions.
//!
//! Resolution walks an ordered list of strategies and stops at the first one
//! that yields a verdict. A missing rule is an absence, never an error, and
//! the last step always answers, so [`FusionMatrix::resolve`] is total.

use std::collections::HashMap;

use super::models::{FusionRule, MoodVerdict, Resolution, ResolutionTier, NEUTRAL_LABEL};

pub const NEUTRAL_FALLBACK_DESCRIPTION: &str = "No exact match found, defaulting to neutral mood.";
pub const UNKNOWN_MOOD: &str = "Unknown";
pub const UNKNOWN_EMOJI: &str = "😐";
pub const UNKNOWN_DESCRIPTION: &str = "Unable to determine mood from fusion matrix.";

type Strategy = fn(&FusionMatrix, &str, &str) -> Option<MoodVerdict>;

const STRATEGIES: &[(ResolutionTier, Strategy)] = &[
    (ResolutionTier::Exact, exact_match),
    (ResolutionTier::NeutralDefault, neutral_default),
];

fn exact_match(matrix: &FusionMatrix, audio: &str, text: &str) -> Option<MoodVerdict> {
    matrix.rule(audio, text).map(FusionRule::verdict)
}

fn neutral_default(matrix: &FusionMatrix, _audio: &str, _text: &str) -> Option<MoodVerdict> {
    matrix
        .rule(NEUTRAL_LABEL, NEUTRAL_LABEL)
        .map(|rule| MoodVerdict {
            final_mood: rule.final_mood.clone(),
            emoji: rule.emoji.clone(),
            description: NEUTRAL_FALLBACK_DESCRIPTION.to_string(),
        })
}

fn absolute_default() -> MoodVerdict {
    MoodVerdict {
        final_mood: UNKNOWN_MOOD.to_string(),
        emoji: UNKNOWN_EMOJI.to_string(),
        description: UNKNOWN_DESCRIPTION.to_string(),
    }
}

/// Read-only rule table, built once and shared for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct FusionMatrix {
    rules: Vec<FusionRule>,
    index: HashMap<(String, String), usize>,
}

impl FusionMatrix {
    /// Builds the matrix from `rules`, lower-casing the keys.
    ///
    /// Rules are expected to be unique per pair (the seed importer and the
    /// database both enforce it); should a duplicate slip through, the first
    /// occurrence wins and the later one is dropped from `list_all` too.
    pub fn from_rules(rules: impl IntoIterator<Item = FusionRule>) -> Self {
        let mut matrix = FusionMatrix::default();
        for mut rule in rules {
            rule.audio_emotion = rule.audio_emotion.to_lowercase();
            rule.text_emotion = rule.text_emotion.to_lowercase();
            let key = (rule.audio_emotion.clone(), rule.text_emotion.clone());
            if matrix.index.contains_key(&key) {
                tracing::warn!(
                    "Ignoring duplicate fusion rule for ({}, {})",
                    key.0,
                    key.1
                );
                continue;
            }
            matrix.index.insert(key, matrix.rules.len());
            matrix.rules.push(rule);
        }
        matrix
    }

    fn rule(&self, audio: &str, text: &str) -> Option<&FusionRule> {
        self.index
            .get(&(audio.to_string(), text.to_string()))
            .and_then(|position| self.rules.get(*position))
    }

    /// Final mood for the pair, compared case-insensitively.
    pub fn resolve(&self, audio_emotion: &str, text_emotion: &str) -> MoodVerdict {
        self.resolve_with_tier(audio_emotion, text_emotion).verdict
    }

    /// Same as [`resolve`](Self::resolve), also reporting which tier answered.
    pub fn resolve_with_tier(&self, audio_emotion: &str, text_emotion: &str) -> Resolution {
        let audio = audio_emotion.to_lowercase();
        let text = text_emotion.to_lowercase();

        for (tier, strategy) in STRATEGIES {
            if let Some(verdict) = strategy(self, &audio, &text) {
                return Resolution {
                    verdict,
                    tier: *tier,
                };
            }
        }

        Resolution {
            verdict: absolute_default(),
            tier: ResolutionTier::AbsoluteDefault,
        }
    }

    /// Every configured rule, in load order.
    pub fn list_all(&self) -> &[FusionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_neutral_rule(&self) -> bool {
        self.rule(NEUTRAL_LABEL, NEUTRAL_LABEL).is_some()
    }
}
