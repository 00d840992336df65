use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An analysis about to be recorded; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub transcribed_text: String,
    pub audio_emotion: String,
    pub audio_confidence: f64,
    pub text_emotion: String,
    pub text_confidence: f64,
    pub final_mood: String,
    pub emoji: String,
    pub description: String,
}

/// A persisted analysis, as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub transcribed_text: String,
    pub audio_emotion: String,
    pub audio_confidence: f64,
    pub text_emotion: String,
    pub text_confidence: f64,
    pub final_mood: String,
    pub emoji: String,
    pub description: String,
}
