//! Stub collaborators standing in for the remote models
//!
//! They are deterministic so every test can predict the fused mood:
//! - the transcript is the uploaded bytes as UTF-8, trimmed;
//! - the audio emotion is the file stem (`happy.wav` -> `happy`);
//! - the text emotion comes from a keyword table.

use async_trait::async_trait;
use mood_fusion_server::audio::AudioClip;
use mood_fusion_server::emotion::{
    AudioEmotionClassifier, ClassifierError, EmotionPrediction, TextEmotionClassifier,
};
use mood_fusion_server::store::{AnalysisRecord, AnalysisStore, NewAnalysis};
use mood_fusion_server::transcription::{Transcriber, TranscriptionError};
use std::path::Path;

pub struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        Ok(String::from_utf8_lossy(&clip.bytes).trim().to_string())
    }
}

pub struct StubAudioClassifier;

#[async_trait]
impl AudioEmotionClassifier for StubAudioClassifier {
    async fn classify(&self, clip: &AudioClip) -> Result<EmotionPrediction, ClassifierError> {
        let stem = Path::new(&clip.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("neutral");
        if stem == "unreachable" {
            return Err(ClassifierError::Connection(
                "audio model unreachable".to_string(),
            ));
        }
        Ok(EmotionPrediction::new(stem, 0.9))
    }
}

const TEXT_KEYWORDS: &[(&str, &str)] = &[
    ("wonderful", "happy"),
    ("love", "happy"),
    ("furious", "angry"),
    ("unacceptable", "angry"),
    ("miss", "sad"),
    ("scared", "fearful"),
];

pub struct StubTextClassifier;

#[async_trait]
impl TextEmotionClassifier for StubTextClassifier {
    async fn classify(&self, text: &str) -> Result<EmotionPrediction, ClassifierError> {
        let lower = text.to_lowercase();
        let prediction = TEXT_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, label)| EmotionPrediction::new(*label, 0.8))
            .unwrap_or_else(|| EmotionPrediction::new("neutral", 0.55));
        Ok(prediction)
    }
}

/// An analysis store whose writes always fail.
pub struct UnwritableStore;

impl AnalysisStore for UnwritableStore {
    fn append(&self, _analysis: &NewAnalysis) -> anyhow::Result<i64> {
        anyhow::bail!("attempt to write a readonly database")
    }

    fn list_recent(&self, _limit: usize) -> anyhow::Result<Vec<AnalysisRecord>> {
        Ok(Vec::new())
    }

    fn get(&self, _id: i64) -> anyhow::Result<Option<AnalysisRecord>> {
        Ok(None)
    }
}
