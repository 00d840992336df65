//! Uploaded audio clips and the rules an upload must satisfy.

mod converter;

pub use converter::{AudioNormalizer, ConversionError, FfmpegNormalizer, PassthroughNormalizer};

use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".m4a", ".ogg", ".flac", ".webm"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File too large. Maximum size is {}MB", megabytes(.max_bytes))]
    TooLarge { max_bytes: usize },

    #[error("Unsupported file format. Allowed formats: {}", .allowed.join(", "))]
    UnsupportedFormat { allowed: Vec<String> },

    #[error("No audio file provided")]
    MissingFile,

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

fn megabytes(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Size and format limits applied before any model is invoked.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_upload_bytes: usize,
    /// Lower-cased, with the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn new(max_upload_bytes: usize, allowed_extensions: &[String]) -> Self {
        Self {
            max_upload_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
        }
    }

    pub fn check_size(&self, size: usize) -> Result<(), UploadError> {
        if size > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Returns the lower-cased extension (with dot) when it is allowed.
    pub fn check_extension(&self, file_name: &str) -> Result<String, UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        if extension.is_empty() || !self.allowed_extensions.contains(&extension) {
            return Err(UploadError::UnsupportedFormat {
                allowed: self.allowed_extensions.clone(),
            });
        }
        Ok(extension)
    }

    /// Validates an upload and wraps it into a clip.
    pub fn accept(&self, file_name: &str, bytes: Vec<u8>) -> Result<AudioClip, UploadError> {
        self.check_size(bytes.len())?;
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }
        let extension = self.check_extension(file_name)?;
        Ok(AudioClip::new(file_name, &extension, bytes))
    }
}

fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

/// Mime type for a known audio extension, used when sniffing finds nothing.
fn mime_from_extension(extension: &str) -> &'static str {
    match extension {
        ".wav" => "audio/wav",
        ".mp3" => "audio/mpeg",
        ".m4a" => "audio/mp4",
        ".ogg" => "audio/ogg",
        ".flac" => "audio/flac",
        ".webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// An audio payload held in memory for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub file_name: String,
    /// Lower-cased, with the leading dot.
    pub extension: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: &str, extension: &str, bytes: Vec<u8>) -> Self {
        let extension = normalize_extension(extension);
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or_else(|| mime_from_extension(&extension))
            .to_string();
        Self {
            file_name: file_name.to_string(),
            extension,
            mime_type,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header() -> Vec<u8> {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    #[test]
    fn default_policy_matches_documented_limits() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(policy.allowed_extensions.len(), 6);
    }

    #[test]
    fn too_large_message_names_limit_in_mb() {
        let policy = UploadPolicy::default();
        let err = policy.check_size(25 * 1024 * 1024 + 1).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 25MB");
        assert!(policy.check_size(25 * 1024 * 1024).is_ok());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.check_extension("Voice.WAV").unwrap(), ".wav");
        assert_eq!(policy.check_extension("memo.m4a").unwrap(), ".m4a");
    }

    #[test]
    fn unsupported_extension_lists_allowed_formats() {
        let policy = UploadPolicy::default();
        for name in ["notes.txt", "noextension", "archive.wav.zip", ""] {
            let err = policy.check_extension(name).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Unsupported file format. Allowed formats: .wav, .mp3, .m4a, .ogg, .flac, .webm"
            );
        }
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let policy = UploadPolicy::new(10, &["WAV".to_string(), ".Opus".to_string()]);
        assert_eq!(policy.allowed_extensions, vec![".wav", ".opus"]);
        assert!(policy.check_extension("a.opus").is_ok());
        assert!(policy.check_extension("a.mp3").is_err());
    }

    #[test]
    fn accept_rejects_empty_and_oversized_payloads() {
        let policy = UploadPolicy::new(8, &[".wav".to_string()]);
        assert_eq!(
            policy.accept("a.wav", Vec::new()).unwrap_err(),
            UploadError::MissingFile
        );
        assert_eq!(
            policy.accept("a.wav", vec![0u8; 9]).unwrap_err(),
            UploadError::TooLarge { max_bytes: 8 }
        );
    }

    #[test]
    fn mime_is_sniffed_then_falls_back_to_extension() {
        let sniffed = AudioClip::new("clip.mp3", ".mp3", wav_header());
        assert_eq!(sniffed.mime_type, "audio/x-wav");

        let fallback = AudioClip::new("clip.webm", ".webm", vec![1, 2, 3, 4]);
        assert_eq!(fallback.mime_type, "audio/webm");
    }
}
