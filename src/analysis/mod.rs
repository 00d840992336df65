//! The end-to-end analysis of one uploaded clip.

mod pipeline;

pub use pipeline::{AnalysisCollaborators, AnalysisPipeline};

use crate::audio::{AudioClip, ConversionError, UploadError};
use crate::emotion::ClassifierError;
use crate::transcription::TranscriptionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// What happens to a computed mood when it cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// The request fails with a 500.
    #[default]
    Strict,
    /// The mood is returned without an id and the failure is logged.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub clip: AudioClip,
    /// Transcript supplied by the client, used instead of calling the transcriber.
    pub transcript: Option<String>,
}

/// Result of an analysis, as returned by `/api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodAnalysis {
    /// Record id, `None` when the result could not be stored.
    pub id: Option<i64>,
    pub transcribed_text: String,
    pub audio_emotion: String,
    pub audio_confidence: f64,
    pub text_emotion: String,
    pub text_confidence: f64,
    pub final_mood: String,
    pub emoji: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("No speech detected in audio file")]
    NoSpeech,

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("Audio conversion failed: {0}")]
    Normalization(#[from] ConversionError),

    #[error("Emotion classification failed: {0}")]
    Classification(#[from] ClassifierError),

    #[error("Failed to store analysis: {0}")]
    Persistence(anyhow::Error),
}

impl AnalysisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AnalysisError::Upload(_) | AnalysisError::NoSpeech => StatusCode::BAD_REQUEST,
            AnalysisError::Transcription(_)
            | AnalysisError::Normalization(_)
            | AnalysisError::Classification(_)
            | AnalysisError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label for the analyses metric: the client's fault or ours.
    pub fn outcome(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "rejected"
        } else {
            "failed"
        }
    }

    /// Message sent to the client in the `detail` field.
    pub fn detail(&self) -> String {
        if self.status_code().is_server_error() {
            format!("Analysis failed: {}", self)
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
