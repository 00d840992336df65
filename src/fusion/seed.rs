//! Declarative seed data for the fusion matrix.
//!
//! A seed file is TOML with one `[[rule]]` table per rule:
//!
//! ```toml
//! [[rule]]
//! audio_emotion = "happy"
//! text_emotion = "happy"
//! final_mood = "Joyful"
//! emoji = "😄"
//! description = "Voice and words are both happy."
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use super::models::{FusionRule, NEUTRAL_LABEL};

const DEFAULT_SEED: &str = include_str!("../../seed/fusion_matrix.toml");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed seed file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Rule #{index}: field '{field}' is required but was empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("Rule #{index}: emoji '{emoji}' must be a single character")]
    InvalidEmoji { index: usize, emoji: String },

    #[error("Rule #{index}: duplicate rule for ({audio}, {text})")]
    DuplicatePair {
        index: usize,
        audio: String,
        text: String,
    },

    #[error("Seed has no ({0}, {0}) rule")]
    MissingNeutralRule(&'static str),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    rule: Vec<FusionRule>,
}

/// Parses and validates seed TOML, returning normalized rules in file order.
pub fn parse_rules(content: &str) -> Result<Vec<FusionRule>, SeedError> {
    let seed: SeedFile = toml::from_str(content)?;
    validate_rules(seed.rule)
}

pub fn load_rules_from_file(path: &Path) -> Result<Vec<FusionRule>, SeedError> {
    let content = std::fs::read_to_string(path)?;
    parse_rules(&content)
}

/// The seed compiled into the binary, covering both full vocabularies.
pub fn default_rules() -> Result<Vec<FusionRule>, SeedError> {
    parse_rules(DEFAULT_SEED)
}

fn validate_rules(rules: Vec<FusionRule>) -> Result<Vec<FusionRule>, SeedError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(rules.len());

    for (index, rule) in rules.into_iter().enumerate() {
        let rule = FusionRule {
            audio_emotion: rule.audio_emotion.trim().to_lowercase(),
            text_emotion: rule.text_emotion.trim().to_lowercase(),
            final_mood: rule.final_mood.trim().to_string(),
            emoji: rule.emoji.trim().to_string(),
            description: rule.description.trim().to_string(),
        };

        if rule.audio_emotion.is_empty() {
            return Err(SeedError::EmptyField {
                index,
                field: "audio_emotion",
            });
        }
        if rule.text_emotion.is_empty() {
            return Err(SeedError::EmptyField {
                index,
                field: "text_emotion",
            });
        }
        if rule.final_mood.is_empty() {
            return Err(SeedError::EmptyField {
                index,
                field: "final_mood",
            });
        }
        if rule.emoji.graphemes(true).count() != 1 {
            return Err(SeedError::InvalidEmoji {
                index,
                emoji: rule.emoji,
            });
        }
        if !seen.insert((rule.audio_emotion.clone(), rule.text_emotion.clone())) {
            return Err(SeedError::DuplicatePair {
                index,
                audio: rule.audio_emotion,
                text: rule.text_emotion,
            });
        }

        normalized.push(rule);
    }

    if !seen.contains(&(NEUTRAL_LABEL.to_string(), NEUTRAL_LABEL.to_string())) {
        return Err(SeedError::MissingNeutralRule(NEUTRAL_LABEL));
    }

    Ok(normalized)
}
