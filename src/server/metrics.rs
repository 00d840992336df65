use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all mood server metrics
const PREFIX: &str = "moodfusion";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Analysis Metrics
    pub static ref ANALYSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_analyses_total"), "Analysis requests by outcome"),
        &["outcome"]
    ).expect("Failed to create analyses_total metric");

    pub static ref FUSION_RESOLUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_fusion_resolutions_total"),
            "Fusion matrix resolutions by the tier that answered"
        ),
        &["tier"]
    ).expect("Failed to create fusion_resolutions_total metric");

    pub static ref STAGE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_stage_duration_seconds"),
            "Duration of each analysis stage in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["stage"]
    ).expect("Failed to create stage_duration_seconds metric");

    pub static ref PERSISTENCE_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_persistence_failures_total"),
        "Analyses whose result could not be stored"
    ).expect("Failed to create persistence_failures_total metric");

    // Matrix Metrics
    pub static ref FUSION_RULES: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_fusion_rules"), "Rules loaded into the fusion matrix"),
        &["source"]
    ).expect("Failed to create fusion_rules metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ANALYSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FUSION_RESOLUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STAGE_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PERSISTENCE_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FUSION_RULES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn set_fusion_rules(source: &str, count: usize) {
    FUSION_RULES.with_label_values(&[source]).set(count as f64);
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of an analysis request ("success", "rejected", "failed").
pub fn record_analysis(outcome: &str) {
    ANALYSES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_fusion_resolution(tier: &str) {
    FUSION_RESOLUTIONS_TOTAL.with_label_values(&[tier]).inc();
}

/// Record how long a pipeline stage ("transcription", "normalization", ...) took.
pub fn record_stage_duration(stage: &str, duration: Duration) {
    STAGE_DURATION_SECONDS
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
}

pub fn record_persistence_failure() {
    PERSISTENCE_FAILURES_TOTAL.inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
