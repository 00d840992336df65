mod matrix;
mod models;
mod seed;

pub use matrix::{
    FusionMatrix, NEUTRAL_FALLBACK_DESCRIPTION, UNKNOWN_DESCRIPTION, UNKNOWN_EMOJI, UNKNOWN_MOOD,
};
pub use models::{
    FusionRule, MoodVerdict, Resolution, ResolutionTier, AUDIO_VOCABULARY, NEUTRAL_LABEL,
    TEXT_VOCABULARY,
};
pub use seed::{default_rules, load_rules_from_file, parse_rules, SeedError};
