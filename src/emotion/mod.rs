//! Emotion classification from audio and from text.
//!
//! Classifiers wrap a model whose raw class names are remapped to the
//! canonical labels the fusion matrix is keyed by. Unknown raw labels pass
//! through lower-cased.

mod factory;
mod inference;
mod labels;

pub use factory::{create_audio_classifier, create_text_classifier};
pub use inference::{InferenceAudioClassifier, InferenceTextClassifier, ScoreKind};
pub use labels::{canonical_audio_label, canonical_text_label, AUDIO_SYNONYMS, TEXT_SYNONYMS};

use crate::audio::AudioClip;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClassifierError::Timeout
        } else {
            ClassifierError::Connection(e.to_string())
        }
    }
}

/// A canonical label with the model's confidence in it, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionPrediction {
    pub label: String,
    pub confidence: f64,
}

impl EmotionPrediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn neutral() -> Self {
        Self::new(crate::fusion::NEUTRAL_LABEL, 1.0)
    }
}

#[async_trait]
pub trait AudioEmotionClassifier: Send + Sync {
    async fn classify(&self, clip: &AudioClip) -> Result<EmotionPrediction, ClassifierError>;
}

#[async_trait]
pub trait TextEmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<EmotionPrediction, ClassifierError>;
}

/// Classifies a transcript, answering `(neutral, 1.0)` for blank text
/// without calling the model.
pub async fn classify_transcript(
    classifier: &dyn TextEmotionClassifier,
    text: &str,
) -> Result<EmotionPrediction, ClassifierError> {
    if text.trim().is_empty() {
        return Ok(EmotionPrediction::neutral());
    }
    classifier.classify(text).await
}
