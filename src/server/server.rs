use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::analysis::{AnalysisError, AnalysisRequest, MoodAnalysis};
use crate::audio::{UploadError, UploadPolicy};
use crate::fusion::{FusionRule, Resolution};
use crate::store::AnalysisRecord;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{log_requests, metrics, state::*};

pub const SERVICE_NAME: &str = "VoiceMoodAnalyzer API";
pub const SERVICE_VERSION: &str = "1.0.0";

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Serialize)]
struct ServerStats {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        status: "online",
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

fn multipart_error(policy: &UploadPolicy, err: MultipartError) -> AnalysisError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge {
            max_bytes: policy.max_upload_bytes,
        }
        .into()
    } else {
        UploadError::Malformed(err.body_text()).into()
    }
}

/// Reads the `file` and optional `transcribed_text` fields, enforcing the
/// size limit while the file streams in.
async fn read_upload(
    policy: &UploadPolicy,
    mut multipart: Multipart,
) -> Result<AnalysisRequest, AnalysisError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut transcript: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(policy, e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error(policy, e))?
                {
                    bytes.extend_from_slice(&chunk);
                    policy.check_size(bytes.len())?;
                }
                file = Some((file_name, bytes));
            }
            "transcribed_text" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(policy, e))?;
                transcript = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or(UploadError::MissingFile)?;
    let clip = policy.accept(&file_name, bytes)?;
    Ok(AnalysisRequest { clip, transcript })
}

async fn analyze(
    State(state): State<ServerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MoodAnalysis>, AnalysisError> {
    let upload = match multipart {
        Ok(multipart) => read_upload(&state.upload_policy, multipart).await,
        Err(rejection) => Err(UploadError::Malformed(rejection.body_text()).into()),
    };
    let request = upload.inspect_err(|e| {
        metrics::record_analysis(e.outcome());
        warn!("Rejected upload: {}", e);
    })?;

    let analysis = state.pipeline.analyze(request).await?;
    Ok(Json(analysis))
}

#[derive(Deserialize, Debug)]
struct HistoryQuery {
    limit: Option<i64>,
}

fn clamp_history_limit(limit: Option<i64>) -> usize {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT) as usize
}

fn query_error(rejection: QueryRejection) -> Response {
    detail_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

async fn get_history(
    State(store): State<GuardedAnalysisStore>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_error(rejection),
    };
    match store.list_recent(clamp_history_limit(query.limit)) {
        Ok(records) => Json::<Vec<AnalysisRecord>>(records).into_response(),
        Err(err) => {
            error!("Failed to load history: {:#}", err);
            detail_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load history: {}", err),
            )
        }
    }
}

#[derive(Serialize)]
struct MatrixEntry<'a> {
    /// 1-based position in load order.
    id: usize,
    #[serde(flatten)]
    rule: &'a FusionRule,
}

async fn get_matrix(State(matrix): State<GuardedFusionMatrix>) -> Response {
    let entries: Vec<MatrixEntry> = matrix
        .list_all()
        .iter()
        .enumerate()
        .map(|(index, rule)| MatrixEntry {
            id: index + 1,
            rule,
        })
        .collect();
    Json(entries).into_response()
}

#[derive(Deserialize, Debug)]
struct ResolveQuery {
    audio: String,
    text: String,
}

async fn resolve_mood(
    State(matrix): State<GuardedFusionMatrix>,
    query: Result<Query<ResolveQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => {
            Json::<Resolution>(matrix.resolve_with_tier(&query.audio, &query.text)).into_response()
        }
        Err(rejection) => query_error(rejection),
    }
}

pub fn make_app(state: ServerState) -> Router {
    let api_routes: Router = Router::new()
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::max(state.config.max_request_body_bytes)),
        )
        .route("/history", get(get_history))
        .route("/matrix", get(get_matrix))
        .route("/matrix/resolve", get(resolve_mood))
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/api", api_routes);

    if let Some(frontend_path) = &state.config.frontend_dir_path {
        let static_files_service =
            ServeDir::new(frontend_path).append_index_html_on_directories(true);
        app = app.fallback_service(static_files_service);
    }

    app.layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serves the api on `state.config.port` and Prometheus metrics on
/// `metrics_port` until `shutdown` resolves.
pub async fn run_server<F>(state: ServerState, metrics_port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = state.config.port;
    let app = make_app(state);
    let metrics_app = Router::new().route("/metrics", get(metrics::metrics_handler));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        info!("Shutting down...");
        let _ = shutdown_tx.send(true);
    });

    let mut api_shutdown = shutdown_rx.clone();
    let mut metrics_shutdown = shutdown_rx;

    let api_server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = api_shutdown.changed().await;
    });
    let metrics_server = axum::serve(metrics_listener, metrics_app).with_graceful_shutdown(
        async move {
            let _ = metrics_shutdown.changed().await;
        },
    );

    tokio::try_join!(
        async { api_server.await.context("API server failed") },
        async { metrics_server.await.context("Metrics server failed") },
    )?;
    Ok(())
}
