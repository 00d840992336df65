//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database directory and
//! stub collaborators.

use super::constants::*;
use super::fixtures::{StubAudioClassifier, StubTextClassifier, StubTranscriber, UnwritableStore};
use mood_fusion_server::analysis::{AnalysisCollaborators, AnalysisPipeline, PersistencePolicy};
use mood_fusion_server::audio::{PassthroughNormalizer, UploadPolicy};
use mood_fusion_server::fusion::FusionMatrix;
use mood_fusion_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use mood_fusion_server::store::{
    seed_if_empty, AnalysisStore, FusionRuleStore, SqliteMoodStore, MOOD_DB_FILE_NAME,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Knobs for the few tests that need a non-default server.
#[derive(Clone)]
pub struct TestServerOptions {
    pub max_upload_bytes: Option<usize>,
    pub persistence: PersistencePolicy,
    /// Make every analysis write fail.
    pub unwritable_store: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: None,
            persistence: PersistencePolicy::Strict,
            unwritable_store: false,
        }
    }
}

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Mood database for direct access in tests
    pub store: Arc<SqliteMoodStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with default options
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be created, the port cannot be bound or
    /// the server doesn't become ready within the timeout.
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");
        let store = Arc::new(
            SqliteMoodStore::new(temp_db_dir.path().join(MOOD_DB_FILE_NAME))
                .expect("Failed to open mood store"),
        );
        seed_if_empty(store.as_ref(), None).expect("Failed to seed fusion matrix");
        let matrix = Arc::new(FusionMatrix::from_rules(
            store.list_rules().expect("Failed to load rules"),
        ));

        let analysis_store: Arc<dyn AnalysisStore> = if options.unwritable_store {
            Arc::new(UnwritableStore)
        } else {
            store.clone()
        };

        let pipeline = AnalysisPipeline::new(
            AnalysisCollaborators {
                transcriber: Arc::new(StubTranscriber),
                audio_classifier: Arc::new(StubAudioClassifier),
                text_classifier: Arc::new(StubTextClassifier),
                normalizer: Arc::new(PassthroughNormalizer),
            },
            matrix,
            analysis_store.clone(),
            options.persistence,
        );

        let upload_policy = match options.max_upload_bytes {
            Some(max_upload_bytes) => UploadPolicy {
                max_upload_bytes,
                ..Default::default()
            },
            None => UploadPolicy::default(),
        };

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
            max_request_body_bytes: ServerConfig::request_body_limit(
                upload_policy.max_upload_bytes,
            ),
        };
        let state = ServerState::new(config, pipeline, analysis_store, upload_policy);
        let app = make_app(state);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
