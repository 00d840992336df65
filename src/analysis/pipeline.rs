use super::{AnalysisError, AnalysisRequest, MoodAnalysis, PersistencePolicy};
use crate::audio::AudioNormalizer;
use crate::emotion::{classify_transcript, AudioEmotionClassifier, TextEmotionClassifier};
use crate::fusion::FusionMatrix;
use crate::server::metrics;
use crate::store::{AnalysisStore, NewAnalysis};
use crate::transcription::Transcriber;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The remote models and audio tooling an analysis depends on.
#[derive(Clone)]
pub struct AnalysisCollaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub audio_classifier: Arc<dyn AudioEmotionClassifier>,
    pub text_classifier: Arc<dyn TextEmotionClassifier>,
    pub normalizer: Arc<dyn AudioNormalizer>,
}

/// Transcribe, classify both ways, fuse, store.
#[derive(Clone)]
pub struct AnalysisPipeline {
    collaborators: AnalysisCollaborators,
    matrix: Arc<FusionMatrix>,
    store: Arc<dyn AnalysisStore>,
    persistence: PersistencePolicy,
}

async fn timed<T>(stage: &str, future: impl Future<Output = T>) -> T {
    let start = Instant::now();
    let output = future.await;
    metrics::record_stage_duration(stage, start.elapsed());
    output
}

impl AnalysisPipeline {
    pub fn new(
        collaborators: AnalysisCollaborators,
        matrix: Arc<FusionMatrix>,
        store: Arc<dyn AnalysisStore>,
        persistence: PersistencePolicy,
    ) -> Self {
        Self {
            collaborators,
            matrix,
            store,
            persistence,
        }
    }

    pub fn matrix(&self) -> &Arc<FusionMatrix> {
        &self.matrix
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<MoodAnalysis, AnalysisError> {
        let result = self.run(request).await;
        match &result {
            Ok(analysis) => {
                metrics::record_analysis("success");
                info!(
                    id = ?analysis.id,
                    "Analysis complete: {} {} (audio {}, text {})",
                    analysis.final_mood,
                    analysis.emoji,
                    analysis.audio_emotion,
                    analysis.text_emotion
                );
            }
            Err(e) => {
                metrics::record_analysis(e.outcome());
                warn!("Analysis {}: {}", e.outcome(), e);
            }
        }
        result
    }

    async fn run(&self, request: AnalysisRequest) -> Result<MoodAnalysis, AnalysisError> {
        let AnalysisRequest { clip, transcript } = request;

        let normalized = timed(
            "normalization",
            self.collaborators.normalizer.normalize(&clip),
        )
        .await?;

        let provided = transcript
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let transcript = match provided {
            Some(text) => {
                debug!("Using client supplied transcript ({} chars)", text.len());
                text
            }
            None => {
                let transcriber = &self.collaborators.transcriber;
                let source = if transcriber.needs_normalized_audio() {
                    &normalized
                } else {
                    &clip
                };
                timed("transcription", transcriber.transcribe(source)).await?
            }
        };
        if transcript.is_empty() {
            return Err(AnalysisError::NoSpeech);
        }

        let (audio, text) = tokio::join!(
            timed(
                "audio_classification",
                self.collaborators.audio_classifier.classify(&normalized),
            ),
            timed(
                "text_classification",
                classify_transcript(self.collaborators.text_classifier.as_ref(), &transcript),
            ),
        );
        let (audio, text) = (audio?, text?);

        let resolution = self.matrix.resolve_with_tier(&audio.label, &text.label);
        metrics::record_fusion_resolution(resolution.tier.as_str());
        debug!(
            "Fused ({}, {}) via {} tier",
            audio.label,
            text.label,
            resolution.tier.as_str()
        );
        let verdict = resolution.verdict;

        let record = NewAnalysis {
            transcribed_text: transcript,
            audio_emotion: audio.label,
            audio_confidence: audio.confidence,
            text_emotion: text.label,
            text_confidence: text.confidence,
            final_mood: verdict.final_mood,
            emoji: verdict.emoji,
            description: verdict.description,
        };
        let id = self.persist(&record)?;

        Ok(MoodAnalysis {
            id,
            transcribed_text: record.transcribed_text,
            audio_emotion: record.audio_emotion,
            audio_confidence: record.audio_confidence,
            text_emotion: record.text_emotion,
            text_confidence: record.text_confidence,
            final_mood: record.final_mood,
            emoji: record.emoji,
            description: record.description,
        })
    }

    fn persist(&self, record: &NewAnalysis) -> Result<Option<i64>, AnalysisError> {
        match self.store.append(record) {
            Ok(id) => Ok(Some(id)),
            Err(e) => match self.persistence {
                PersistencePolicy::Strict => Err(AnalysisError::Persistence(e)),
                PersistencePolicy::BestEffort => {
                    metrics::record_persistence_failure();
                    warn!("Returning analysis without storing it: {:#}", e);
                    Ok(None)
                }
            },
        }
    }
}
