use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mood_fusion_server::analysis::{AnalysisCollaborators, AnalysisPipeline, PersistencePolicy};
use mood_fusion_server::audio::{AudioNormalizer, FfmpegNormalizer, PassthroughNormalizer};
use mood_fusion_server::config::{AppConfig, CliConfig, FileConfig, TranscriberBackend};
use mood_fusion_server::emotion::{create_audio_classifier, create_text_classifier};
use mood_fusion_server::fusion::FusionMatrix;
use mood_fusion_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use mood_fusion_server::store::{seed_if_empty, FusionRuleStore, SqliteMoodStore};
use mood_fusion_server::transcription::create_transcriber;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in it override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the mood database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Fusion rules to import when the database has none. Defaults to the built-in rules.
    #[clap(long, value_parser = parse_path)]
    pub seed_file: Option<PathBuf>,

    /// What to do with a computed mood that cannot be stored.
    #[clap(long, value_enum, default_value = "strict")]
    pub persistence: PersistencePolicy,

    /// Speech-to-text backend.
    #[clap(long, value_enum, default_value = "openai")]
    pub transcriber: TranscriberBackend,

    /// Base url of the transcription service.
    #[clap(long)]
    pub transcriber_url: Option<String>,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub transcriber_api_key: Option<String>,

    /// Inference endpoint of the audio emotion model.
    #[clap(long)]
    pub audio_classifier_url: Option<String>,

    /// Inference endpoint of the text emotion model.
    #[clap(long)]
    pub text_classifier_url: Option<String>,

    #[clap(long, env = "HF_API_KEY", hide_env_values = true)]
    pub classifier_api_key: Option<String>,

    /// Maximum upload size in megabytes.
    #[clap(long)]
    pub max_upload_mb: Option<usize>,

    /// Send uploads to the audio classifier as-is instead of converting them
    /// to 16kHz mono WAV with ffmpeg.
    #[clap(long)]
    pub no_audio_normalization: bool,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            seed_file: args.seed_file.clone(),
            persistence: args.persistence,
            transcriber: args.transcriber,
            transcriber_url: args.transcriber_url.clone(),
            transcriber_api_key: args.transcriber_api_key.clone(),
            audio_classifier_url: args.audio_classifier_url.clone(),
            text_classifier_url: args.text_classifier_url.clone(),
            classifier_api_key: args.classifier_api_key.clone(),
            max_upload_mb: args.max_upload_mb,
            no_audio_normalization: args.no_audio_normalization,
        }
    }
}

async fn create_normalizer(config: &AppConfig) -> Arc<dyn AudioNormalizer> {
    if !config.normalization.enabled {
        info!("Audio normalization disabled, uploads are classified as-is");
        return Arc::new(PassthroughNormalizer);
    }

    let ffmpeg = FfmpegNormalizer::new(config.normalization.ffmpeg_path.clone());
    match ffmpeg.check_available().await {
        Ok(()) => {
            info!(
                "Normalizing audio with {:?}",
                config.normalization.ffmpeg_path
            );
            Arc::new(ffmpeg)
        }
        Err(e) => {
            warn!(
                "ffmpeg not usable ({}), uploads will be classified as-is",
                e
            );
            Arc::new(PassthroughNormalizer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let db_path = config.mood_db_path();
    info!("Opening mood database at {:?}...", db_path);
    let store = Arc::new(SqliteMoodStore::new(&db_path)?);

    let imported = seed_if_empty(store.as_ref(), config.seed_file.as_deref())?;
    if imported > 0 {
        info!("Imported {} fusion rules", imported);
    }

    let matrix = FusionMatrix::from_rules(store.list_rules()?);
    if !matrix.has_neutral_rule() {
        warn!("Fusion matrix has no (neutral, neutral) rule, unmatched pairs resolve to Unknown");
    }
    server::metrics::set_fusion_rules("database", matrix.len());
    info!("Fusion matrix loaded with {} rules", matrix.len());

    let collaborators = AnalysisCollaborators {
        transcriber: create_transcriber(&config.transcriber),
        audio_classifier: create_audio_classifier(&config.audio_classifier),
        text_classifier: create_text_classifier(&config.text_classifier),
        normalizer: create_normalizer(&config).await,
    };
    let pipeline = AnalysisPipeline::new(
        collaborators,
        Arc::new(matrix),
        store.clone(),
        config.persistence,
    );
    info!("Persistence policy: {:?}", config.persistence);

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        max_request_body_bytes: ServerConfig::request_body_limit(config.upload.max_upload_bytes),
    };
    let state = ServerState::new(server_config, pipeline, store, config.upload.clone());

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(state, config.metrics_port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
