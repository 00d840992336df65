mod file_config;

pub use file_config::{AudioConfig, ClassifiersConfig, FileConfig, TranscriberConfig, UploadConfig};

use crate::analysis::PersistencePolicy;
use crate::audio::{UploadPolicy, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};
use crate::emotion::ScoreKind;
use crate::server::RequestsLoggingLevel;
use crate::store::MOOD_DB_FILE_NAME;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_AUDIO_CLASSIFIER_URL: &str = "https://api-inference.huggingface.co/models/ehcalabres/wav2vec2-lg-xlsr-en-speech-emotion-recognition";
pub const DEFAULT_TEXT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/j-hartmann/emotion-english-distilroberta-base";
const DEFAULT_TRANSCRIBER_TIMEOUT_SEC: u64 = 120;
const DEFAULT_CLASSIFIER_TIMEOUT_SEC: u64 = 60;

/// Which speech-to-text service transcribes uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum TranscriberBackend {
    /// OpenAI-compatible `/audio/transcriptions` API.
    #[default]
    Openai,
    /// whisper.cpp server `/inference` endpoint.
    WhisperCpp,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub persistence: PersistencePolicy,
    pub transcriber: TranscriberBackend,
    pub transcriber_url: Option<String>,
    pub transcriber_api_key: Option<String>,
    pub audio_classifier_url: Option<String>,
    pub text_classifier_url: Option<String>,
    pub classifier_api_key: Option<String>,
    pub max_upload_mb: Option<usize>,
    pub no_audio_normalization: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub persistence: PersistencePolicy,

    // Collaborators
    pub transcriber: TranscriberSettings,
    pub audio_classifier: ClassifierSettings,
    pub text_classifier: ClassifierSettings,
    pub upload: UploadPolicy,
    pub normalization: NormalizationSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriberSettings {
    pub backend: TranscriberBackend,
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub language: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub scores: ScoreKind,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationSettings {
    pub enabled: bool,
    pub ffmpeg_path: PathBuf,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => parse_value_enum::<RequestsLoggingLevel>("logging_level", &s)?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let seed_file = file
            .seed_file
            .map(PathBuf::from)
            .or_else(|| cli.seed_file.clone());
        if let Some(seed_file) = &seed_file {
            if !seed_file.is_file() {
                bail!("Seed file not found: {:?}", seed_file);
            }
        }

        let persistence = match file.persistence {
            Some(s) => parse_value_enum::<PersistencePolicy>("persistence", &s)?,
            None => cli.persistence,
        };

        let transcriber = Self::resolve_transcriber(cli, file.transcriber.unwrap_or_default())?;
        let (audio_classifier, text_classifier) =
            Self::resolve_classifiers(cli, file.classifiers.unwrap_or_default())?;

        let upload_file = file.upload.unwrap_or_default();
        let max_upload_bytes = match upload_file.max_size_mb.or(cli.max_upload_mb) {
            Some(mb) => match mb.checked_mul(1024 * 1024) {
                Some(bytes) => bytes,
                None => bail!("Maximum upload size of {}MB is too large", mb),
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };
        if max_upload_bytes == 0 {
            bail!("Maximum upload size must be greater than zero");
        }
        let allowed_extensions = upload_file.allowed_extensions.unwrap_or_else(|| {
            DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect()
        });
        if allowed_extensions.is_empty() {
            bail!("At least one allowed upload extension is required");
        }
        let upload = UploadPolicy::new(max_upload_bytes, &allowed_extensions);

        let audio_file = file.audio.unwrap_or_default();
        let normalization = NormalizationSettings {
            enabled: audio_file.normalize.unwrap_or(!cli.no_audio_normalization),
            ffmpeg_path: audio_file
                .ffmpeg_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            seed_file,
            persistence,
            transcriber,
            audio_classifier,
            text_classifier,
            upload,
            normalization,
        })
    }

    fn resolve_transcriber(cli: &CliConfig, file: TranscriberConfig) -> Result<TranscriberSettings> {
        let backend = match file.backend {
            Some(s) => parse_value_enum::<TranscriberBackend>("transcriber.backend", &s)?,
            None => cli.transcriber,
        };

        let url = file.url.or_else(|| cli.transcriber_url.clone());
        let url = match (backend, url) {
            (_, Some(url)) => url,
            (TranscriberBackend::Openai, None) => DEFAULT_OPENAI_URL.to_string(),
            (TranscriberBackend::WhisperCpp, None) => {
                bail!("The whisper_cpp transcriber requires a server url (--transcriber-url or [transcriber].url)")
            }
        };
        validate_url("transcriber url", &url)?;

        Ok(TranscriberSettings {
            backend,
            url: url.trim_end_matches('/').to_string(),
            api_key: file.api_key.or_else(|| cli.transcriber_api_key.clone()),
            model: file
                .model
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            language: file.language,
            timeout: Duration::from_secs(
                file.timeout_sec.unwrap_or(DEFAULT_TRANSCRIBER_TIMEOUT_SEC),
            ),
        })
    }

    fn resolve_classifiers(
        cli: &CliConfig,
        file: ClassifiersConfig,
    ) -> Result<(ClassifierSettings, ClassifierSettings)> {
        let api_key = file.api_key.or_else(|| cli.classifier_api_key.clone());
        let timeout =
            Duration::from_secs(file.timeout_sec.unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_SEC));

        let audio_url = file
            .audio_url
            .or_else(|| cli.audio_classifier_url.clone())
            .unwrap_or_else(|| DEFAULT_AUDIO_CLASSIFIER_URL.to_string());
        validate_url("audio classifier url", &audio_url)?;
        let text_url = file
            .text_url
            .or_else(|| cli.text_classifier_url.clone())
            .unwrap_or_else(|| DEFAULT_TEXT_CLASSIFIER_URL.to_string());
        validate_url("text classifier url", &text_url)?;

        let audio_scores = parse_score_kind("classifiers.audio_scores", file.audio_scores)?;
        let text_scores = parse_score_kind("classifiers.text_scores", file.text_scores)?;

        Ok((
            ClassifierSettings {
                url: audio_url,
                api_key: api_key.clone(),
                scores: audio_scores,
                timeout,
            },
            ClassifierSettings {
                url: text_url,
                api_key,
                scores: text_scores,
                timeout,
            },
        ))
    }

    pub fn mood_db_path(&self) -> PathBuf {
        self.db_dir.join(MOOD_DB_FILE_NAME)
    }
}

fn validate_url(what: &str, url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("Invalid {}: {:?} (expected http:// or https://)", what, url);
    }
    Ok(())
}

fn parse_score_kind(field: &str, value: Option<String>) -> Result<ScoreKind> {
    match value.as_deref().map(str::trim) {
        None => Ok(ScoreKind::default()),
        Some(s) => serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
            .with_context(|| format!("Invalid {}: {:?}", field, s)),
    }
}

/// Parses a config string into a clap `ValueEnum`, case-insensitively.
fn parse_value_enum<T: ValueEnum>(field: &str, s: &str) -> Result<T> {
    T::from_str(s.trim(), true).map_err(|e| anyhow::anyhow!("Invalid {}: {}", field, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_for(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 8000,
            metrics_port: 9091,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_value_enum::<RequestsLoggingLevel>("logging_level", "none"),
            Ok(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_value_enum::<RequestsLoggingLevel>("logging_level", "PATH"),
            Ok(RequestsLoggingLevel::Path)
        ));
        assert!(parse_value_enum::<RequestsLoggingLevel>("logging_level", "loud").is_err());
    }

    #[test]
    fn test_resolve_cli_only_uses_defaults() {
        let temp_dir = make_temp_db_dir();
        let config = AppConfig::resolve(&cli_for(&temp_dir), None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 8000);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.persistence, PersistencePolicy::Strict);
        assert_eq!(config.transcriber.backend, TranscriberBackend::Openai);
        assert_eq!(config.transcriber.url, DEFAULT_OPENAI_URL);
        assert_eq!(config.transcriber.model, DEFAULT_TRANSCRIPTION_MODEL);
        assert_eq!(config.audio_classifier.url, DEFAULT_AUDIO_CLASSIFIER_URL);
        assert_eq!(config.text_classifier.url, DEFAULT_TEXT_CLASSIFIER_URL);
        assert_eq!(config.text_classifier.scores, ScoreKind::Probabilities);
        assert_eq!(config.upload.max_upload_bytes, 25 * 1024 * 1024);
        assert!(config.normalization.enabled);
        assert_eq!(config.mood_db_path(), temp_dir.path().join("mood.db"));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            transcriber_api_key: Some("cli-key".to_string()),
            classifier_api_key: Some("cli-hf".to_string()),
            max_upload_mb: Some(5),
            ..cli_for(&temp_dir)
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            persistence: Some("best_effort".to_string()),
            transcriber: Some(TranscriberConfig {
                backend: Some("whisper_cpp".to_string()),
                url: Some("http://localhost:8178/".to_string()),
                ..Default::default()
            }),
            classifiers: Some(ClassifiersConfig {
                text_scores: Some("logits".to_string()),
                ..Default::default()
            }),
            upload: Some(UploadConfig {
                max_size_mb: Some(10),
                allowed_extensions: Some(vec!["WAV".to_string()]),
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.persistence, PersistencePolicy::BestEffort);
        assert_eq!(config.transcriber.backend, TranscriberBackend::WhisperCpp);
        assert_eq!(config.transcriber.url, "http://localhost:8178");
        assert_eq!(config.text_classifier.scores, ScoreKind::Logits);
        assert_eq!(config.audio_classifier.scores, ScoreKind::Probabilities);
        assert_eq!(config.upload.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.allowed_extensions, vec![".wav"]);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.transcriber.api_key.as_deref(), Some("cli-key"));
        assert_eq!(config.text_classifier.api_key.as_deref(), Some("cli-hf"));
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_whisper_cpp_requires_url() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            transcriber: TranscriberBackend::WhisperCpp,
            ..cli_for(&temp_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("requires a server url"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = make_temp_db_dir();

        let bad_backend = FileConfig {
            transcriber: Some(TranscriberConfig {
                backend: Some("carrier_pigeon".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(bad_backend)).is_err());

        let bad_url = FileConfig {
            classifiers: Some(ClassifiersConfig {
                audio_url: Some("localhost:9000".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli_for(&temp_dir), Some(bad_url)).unwrap_err();
        assert!(err.to_string().contains("audio classifier url"));

        let bad_scores = FileConfig {
            classifiers: Some(ClassifiersConfig {
                audio_scores: Some("percent".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(bad_scores)).is_err());

        let bad_persistence = FileConfig {
            persistence: Some("sometimes".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(bad_persistence)).is_err());
    }

    #[test]
    fn test_upload_size_limits_are_validated() {
        let temp_dir = make_temp_db_dir();

        let huge = CliConfig {
            max_upload_mb: Some(usize::MAX / 1024),
            ..cli_for(&temp_dir)
        };
        let err = AppConfig::resolve(&huge, None).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let file_config = FileConfig {
            upload: Some(UploadConfig {
                max_size_mb: Some(usize::MAX),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_for(&temp_dir), Some(file_config)).is_err());

        let zero = CliConfig {
            max_upload_mb: Some(0),
            ..cli_for(&temp_dir)
        };
        let err = AppConfig::resolve(&zero, None).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_missing_seed_file_is_rejected() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            seed_file: Some(temp_dir.path().join("missing.toml")),
            ..cli_for(&temp_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Seed file not found"));
    }

    #[test]
    fn test_audio_normalization_toggle() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            no_audio_normalization: true,
            ..cli_for(&temp_dir)
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(!config.normalization.enabled);

        let file_config = FileConfig {
            audio: Some(AudioConfig {
                normalize: Some(true),
                ffmpeg_path: Some("/opt/ffmpeg/bin/ffmpeg".to_string()),
            }),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(config.normalization.enabled);
        assert_eq!(
            config.normalization.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
    }
}
