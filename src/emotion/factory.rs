//! Factory functions for the emotion classifiers

use super::{
    AudioEmotionClassifier, InferenceAudioClassifier, InferenceTextClassifier,
    TextEmotionClassifier,
};
use crate::config::ClassifierSettings;
use std::sync::Arc;
use tracing::info;

pub fn create_audio_classifier(settings: &ClassifierSettings) -> Arc<dyn AudioEmotionClassifier> {
    info!(
        "Creating audio emotion classifier at {} (scores: {:?})",
        settings.url, settings.scores
    );
    Arc::new(InferenceAudioClassifier::new(
        settings.url.clone(),
        settings.api_key.clone(),
        settings.timeout,
        settings.scores,
    ))
}

pub fn create_text_classifier(settings: &ClassifierSettings) -> Arc<dyn TextEmotionClassifier> {
    info!(
        "Creating text emotion classifier at {} (scores: {:?})",
        settings.url, settings.scores
    );
    Arc::new(InferenceTextClassifier::new(
        settings.url.clone(),
        settings.api_key.clone(),
        settings.timeout,
        settings.scores,
    ))
}
