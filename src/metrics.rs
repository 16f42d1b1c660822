use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all telemetry metrics
const PREFIX: &str = "telemetry";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // External API Metrics
    pub static ref API_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_api_requests_total"), "Total number of streaming API requests"),
        &["endpoint", "outcome"]
    ).expect("Failed to create api_requests_total metric");

    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_api_request_duration_seconds"),
            "Streaming API request duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["endpoint"]
    ).expect("Failed to create api_request_duration_seconds metric");

    // Pipeline Metrics
    pub static ref FEATURE_BATCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_feature_batches_total"), "Audio feature batches by outcome"),
        &["outcome"]
    ).expect("Failed to create feature_batches_total metric");

    pub static ref PIPELINE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_pipeline_runs_total"), "Pipeline runs by provenance of the result"),
        &["provenance"]
    ).expect("Failed to create pipeline_runs_total metric");

    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_cache_lookups_total"), "Result cache lookups"),
        &["result"]
    ).expect("Failed to create cache_lookups_total metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    // Already-registered errors are expected on repeated calls
    let _ = REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(API_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(FEATURE_BATCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()));

    tracing::debug!("Metrics registered");
}

pub fn record_api_request(endpoint: &str, outcome: &str, duration: Duration) {
    API_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_feature_batch(outcome: &str) {
    FEATURE_BATCHES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_pipeline_run(provenance: &str) {
    PIPELINE_RUNS_TOTAL.with_label_values(&[provenance]).inc();
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

/// Render all registered metrics in the Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            String::new()
        }
    }
}
