use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<String>,
    /// "strict" or "best_effort"
    pub persistence: Option<String>,

    // Collaborators
    pub transcriber: Option<TranscriberConfig>,
    pub classifiers: Option<ClassifiersConfig>,
    pub upload: Option<UploadConfig>,
    pub audio: Option<AudioConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TranscriberConfig {
    /// "openai" or "whisper_cpp"
    pub backend: Option<String>,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassifiersConfig {
    pub audio_url: Option<String>,
    pub text_url: Option<String>,
    pub api_key: Option<String>,
    /// "probabilities" or "logits"
    pub audio_scores: Option<String>,
    pub text_scores: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: Option<usize>,
    pub allowed_extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AudioConfig {
    pub normalize: Option<bool>,
    pub ffmpeg_path: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
