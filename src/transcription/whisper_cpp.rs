use super::{audio_part, read_transcript, Transcriber, TranscriptionError};
use crate::audio::AudioClip;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for the `whisper.cpp` example server (`whisper-server`).
pub struct WhisperCppTranscriber {
    client: Client,
    base_url: String,
    language: Option<String>,
    timeout: Duration,
}

impl WhisperCppTranscriber {
    pub fn new(base_url: impl Into<String>, language: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language,
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        let url = format!("{}/inference", self.base_url);
        debug!("Transcribing {} ({} bytes) via {}", clip.file_name, clip.len(), url);

        let mut form = reqwest::multipart::Form::new()
            .part("file", audio_part(clip)?)
            .text("temperature", "0.0")
            .text("response_format", "json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;
        read_transcript(response).await
    }

    // whisper-server only converts other formats when started with --convert.
    fn needs_normalized_audio(&self) -> bool {
        true
    }
}
