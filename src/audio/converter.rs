//! Audio normalization using ffmpeg.

use super::AudioClip;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Errors that can occur during audio conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("ffmpeg failed: {0}")]
    ConversionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

/// Turns an arbitrary upload into something the audio classifier can read.
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    async fn normalize(&self, clip: &AudioClip) -> Result<AudioClip, ConversionError>;
}

/// Re-encodes every clip to 16kHz mono WAV.
///
/// Each call works inside its own temporary directory, removed on return.
pub struct FfmpegNormalizer {
    ffmpeg_path: PathBuf,
}

impl FfmpegNormalizer {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Check that the configured ffmpeg binary runs.
    pub async fn check_available(&self) -> Result<(), ConversionError> {
        let status = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(ConversionError::ConversionFailed(format!(
                "{:?} not found or not working",
                self.ffmpeg_path
            )));
        }
        Ok(())
    }

    async fn convert_to_wav(&self, input_path: &Path, output_path: &Path) -> Result<(), ConversionError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(input_path)
            .args([
                "-vn",
                "-ac",
                "1",
                "-ar",
                &TARGET_SAMPLE_RATE.to_string(),
                "-f",
                "wav",
                "-y",
            ])
            .arg(output_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::ConversionFailed(stderr.trim().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioNormalizer for FfmpegNormalizer {
    async fn normalize(&self, clip: &AudioClip) -> Result<AudioClip, ConversionError> {
        let work_dir = tempfile::Builder::new().prefix("mood-clip-").tempdir()?;
        let input_path = work_dir.path().join(format!("input{}", clip.extension));
        let output_path = work_dir.path().join("normalized.wav");

        tokio::fs::write(&input_path, &clip.bytes).await?;
        self.convert_to_wav(&input_path, &output_path).await?;

        let bytes = tokio::fs::read(&output_path).await?;
        if bytes.is_empty() {
            return Err(ConversionError::InvalidOutput(
                "ffmpeg produced an empty file".to_string(),
            ));
        }
        debug!(
            "Normalized {} ({} bytes) to {} bytes of 16kHz mono WAV",
            clip.file_name,
            clip.len(),
            bytes.len()
        );

        let stem = Path::new(&clip.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip");
        Ok(AudioClip::new(&format!("{}.wav", stem), ".wav", bytes))
    }
}

/// Hands the clip through untouched, for backends that decode any format.
pub struct PassthroughNormalizer;

#[async_trait]
impl AudioNormalizer for PassthroughNormalizer {
    async fn normalize(&self, clip: &AudioClip) -> Result<AudioClip, ConversionError> {
        Ok(clip.clone())
    }
}
