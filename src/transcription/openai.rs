use super::{audio_part, read_transcript, Transcriber, TranscriptionError};
use crate::audio::AudioClip;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
///
/// Works against the hosted Whisper API as well as local servers exposing the
/// same route (faster-whisper-server, speaches, ...).
pub struct OpenAiTranscriber {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
    timeout: Duration,
}

impl OpenAiTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        language: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            language,
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        debug!("Transcribing {} ({} bytes) via {}", clip.file_name, clip.len(), url);

        let mut form = reqwest::multipart::Form::new()
            .part("file", audio_part(clip)?)
            .text("model", self.model.clone())
            .text("response_format", "json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&url).timeout(self.timeout).multipart(form);
        if let Some(api_key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", api_key));
        }

        read_transcript(request.send().await?).await
    }
}
