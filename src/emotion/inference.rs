//! Classifiers backed by a Hugging Face style inference endpoint.
//!
//! Audio is posted as the raw request body, text as `{"inputs": "..."}`.
//! The endpoint answers with a list of `{label, score}`, sometimes wrapped
//! in an extra list (one per input); the highest score wins.

use super::labels::{canonical_audio_label, canonical_text_label};
use super::{AudioEmotionClassifier, ClassifierError, EmotionPrediction, TextEmotionClassifier};
use crate::audio::AudioClip;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// What the `score` field of the endpoint response holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Already softmaxed, used as the confidence directly.
    #[default]
    Probabilities,
    /// Raw logits, softmaxed before picking the best class.
    Logits,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceOutput {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

impl InferenceOutput {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            InferenceOutput::Flat(scores) => scores,
            InferenceOutput::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        }
    }
}

fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest scoring raw label and its confidence.
fn best_label(scores: &[LabelScore], kind: ScoreKind) -> Result<(String, f64), ClassifierError> {
    if scores.is_empty() {
        return Err(ClassifierError::InvalidResponse(
            "Endpoint returned no labels".to_string(),
        ));
    }

    let raw: Vec<f64> = scores.iter().map(|s| s.score).collect();
    let confidences = match kind {
        ScoreKind::Probabilities => raw,
        ScoreKind::Logits => softmax(&raw),
    };

    let (index, confidence) = confidences
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, c)| {
            if c > best.1 {
                (i, c)
            } else {
                best
            }
        });
    Ok((scores[index].label.clone(), confidence))
}

struct InferenceEndpoint {
    client: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    score_kind: ScoreKind,
}

impl InferenceEndpoint {
    fn new(url: String, api_key: Option<String>, timeout: Duration, score_kind: ScoreKind) -> Self {
        Self {
            client: Client::new(),
            url,
            api_key,
            timeout,
            score_kind,
        }
    }

    fn post(&self) -> RequestBuilder {
        let mut request = self.client.post(&self.url).timeout(self.timeout);
        if let Some(api_key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", api_key));
        }
        request
    }

    async fn best_label(&self, request: RequestBuilder) -> Result<(String, f64), ClassifierError> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let output: InferenceOutput = response.json().await.map_err(|e| {
            ClassifierError::InvalidResponse(format!("Failed to parse inference response: {}", e))
        })?;
        best_label(&output.into_scores(), self.score_kind)
    }
}

pub struct InferenceAudioClassifier {
    endpoint: InferenceEndpoint,
}

impl InferenceAudioClassifier {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        score_kind: ScoreKind,
    ) -> Self {
        Self {
            endpoint: InferenceEndpoint::new(url.into(), api_key, timeout, score_kind),
        }
    }
}

#[async_trait]
impl AudioEmotionClassifier for InferenceAudioClassifier {
    async fn classify(&self, clip: &AudioClip) -> Result<EmotionPrediction, ClassifierError> {
        let request = self
            .endpoint
            .post()
            .header(header::CONTENT_TYPE, clip.mime_type.as_str())
            .body(clip.bytes.clone());

        let (raw_label, confidence) = self.endpoint.best_label(request).await?;
        let label = canonical_audio_label(&raw_label);
        debug!(raw = %raw_label, label = %label, confidence, "Audio emotion classified");
        Ok(EmotionPrediction::new(label, confidence))
    }
}

#[derive(Serialize)]
struct TextInputs<'a> {
    inputs: &'a str,
}

pub struct InferenceTextClassifier {
    endpoint: InferenceEndpoint,
}

impl InferenceTextClassifier {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        score_kind: ScoreKind,
    ) -> Self {
        Self {
            endpoint: InferenceEndpoint::new(url.into(), api_key, timeout, score_kind),
        }
    }
}

#[async_trait]
impl TextEmotionClassifier for InferenceTextClassifier {
    async fn classify(&self, text: &str) -> Result<EmotionPrediction, ClassifierError> {
        let request = self.endpoint.post().json(&TextInputs { inputs: text });

        let (raw_label, confidence) = self.endpoint.best_label(request).await?;
        let label = canonical_text_label(&raw_label);
        debug!(raw = %raw_label, label = %label, confidence, "Text emotion classified");
        Ok(EmotionPrediction::new(label, confidence))
    }
}
