//! Speech-to-text for uploaded clips.
//!
//! One [`Transcriber`] trait, with the concrete backend picked from config by
//! [`create_transcriber`]. A transcript is always trimmed; an empty one means
//! the clip contained no speech.

mod factory;
mod openai;
mod whisper_cpp;

pub use factory::create_transcriber;
pub use openai::OpenAiTranscriber;
pub use whisper_cpp::WhisperCppTranscriber;

use crate::audio::AudioClip;
use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transcription request timed out")]
    Timeout,

    #[error("Transcription API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid transcription response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Connection(e.to_string())
        }
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the trimmed transcript, empty when nothing was said.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError>;

    /// Whether the backend only decodes 16kHz mono WAV and must be sent the
    /// normalized clip rather than the upload.
    fn needs_normalized_audio(&self) -> bool {
        false
    }
}

/// `{"text": "..."}`, the json shape both backends answer with.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

fn audio_part(clip: &AudioClip) -> Result<reqwest::multipart::Part, TranscriptionError> {
    reqwest::multipart::Part::bytes(clip.bytes.clone())
        .file_name(clip.file_name.clone())
        .mime_str(&clip.mime_type)
        .map_err(|e| TranscriptionError::InvalidResponse(format!("Bad mime type: {}", e)))
}

async fn read_transcript(response: Response) -> Result<String, TranscriptionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TranscriptionError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let result: TranscriptionResponse = response
        .json()
        .await
        .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;
    Ok(result.text.trim().to_string())
}
