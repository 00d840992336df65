use serde::{Deserialize, Serialize};

/// Canonical labels the audio classifiers emit after synonym remapping.
pub const AUDIO_VOCABULARY: &[&str] = &[
    "angry", "disgust", "fear", "happy", "neutral", "sad", "surprise",
];

/// Canonical labels the text classifiers emit after synonym remapping.
pub const TEXT_VOCABULARY: &[&str] = &[
    "angry",
    "disgusted",
    "fearful",
    "happy",
    "neutral",
    "sad",
    "surprised",
];

/// Label both sides fall back to when a pair has no rule of its own.
pub const NEUTRAL_LABEL: &str = "neutral";

/// A single row of the fusion matrix.
///
/// The `(audio_emotion, text_emotion)` pair is the natural key, labels are
/// stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionRule {
    pub audio_emotion: String,
    pub text_emotion: String,
    pub final_mood: String,
    pub emoji: String,
    #[serde(default)]
    pub description: String,
}

impl FusionRule {
    pub fn key(&self) -> (&str, &str) {
        (&self.audio_emotion, &self.text_emotion)
    }

    pub fn verdict(&self) -> MoodVerdict {
        MoodVerdict {
            final_mood: self.final_mood.clone(),
            emoji: self.emoji.clone(),
            description: self.description.clone(),
        }
    }
}

/// The mood the end user sees for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodVerdict {
    pub final_mood: String,
    pub emoji: String,
    pub description: String,
}

/// Which resolution strategy produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// A rule exists for the exact pair.
    Exact,
    /// The `(neutral, neutral)` rule stood in for a missing pair.
    NeutralDefault,
    /// Not even the neutral rule was configured.
    AbsoluteDefault,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::Exact => "exact",
            ResolutionTier::NeutralDefault => "neutral_default",
            ResolutionTier::AbsoluteDefault => "absolute_default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    #[serde(flatten)]
    pub verdict: MoodVerdict,
    pub tier: ResolutionTier,
}
