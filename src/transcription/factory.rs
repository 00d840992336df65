//! Factory function for the configured transcription backend

use super::{OpenAiTranscriber, Transcriber, WhisperCppTranscriber};
use crate::config::{TranscriberBackend, TranscriberSettings};
use std::sync::Arc;
use tracing::{info, warn};

pub fn create_transcriber(settings: &TranscriberSettings) -> Arc<dyn Transcriber> {
    match settings.backend {
        TranscriberBackend::Openai => {
            info!(
                "Creating OpenAI-compatible transcriber at {} (model: {})",
                settings.url, settings.model
            );
            if settings.api_key.is_none() {
                warn!("No transcriber API key configured, requests will be unauthenticated");
            }
            Arc::new(OpenAiTranscriber::new(
                settings.url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
                settings.language.clone(),
                settings.timeout,
            ))
        }
        TranscriberBackend::WhisperCpp => {
            info!("Creating whisper.cpp transcriber at {}", settings.url);
            Arc::new(WhisperCppTranscriber::new(
                settings.url.clone(),
                settings.language.clone(),
                settings.timeout,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioClip;
    use crate::test_support::spawn_router;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn whisper_cpp_backend_hits_inference_route() {
        let router = Router::new()
            .route("/inference", post(|| async { Json(json!({"text": "from whisper.cpp"})) }))
            .route(
                "/audio/transcriptions",
                post(|| async { Json(json!({"text": "from openai"})) }),
            );
        let base_url = spawn_router(router).await;

        let mut settings = TranscriberSettings {
            backend: TranscriberBackend::WhisperCpp,
            url: base_url,
            api_key: None,
            model: "whisper-1".to_string(),
            language: None,
            timeout: Duration::from_secs(5),
        };
        let clip = AudioClip::new("a.wav", ".wav", vec![0; 8]);

        let transcriber = create_transcriber(&settings);
        assert_eq!(transcriber.transcribe(&clip).await.unwrap(), "from whisper.cpp");

        settings.backend = TranscriberBackend::Openai;
        let transcriber = create_transcriber(&settings);
        assert_eq!(transcriber.transcribe(&clip).await.unwrap(), "from openai");
    }
}
