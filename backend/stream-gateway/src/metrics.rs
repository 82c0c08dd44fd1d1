use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder};

static STREAM_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "stream_gateway_requests_total",
            "Stream requests handled by stream-gateway, by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create stream_gateway_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_gateway_requests_total");
    counter
});

static STREAM_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "stream_gateway_request_duration_seconds",
            "Stream request latency for stream-gateway",
        )
        .buckets(vec![
            0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0,
        ]),
        &["outcome"],
    )
    .expect("failed to create stream_gateway_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register stream_gateway_request_duration_seconds");
    histogram
});

static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "stream_gateway_cache_lookups_total",
            "URL cache lookups by result (hit, stale, miss)",
        ),
        &["result"],
    )
    .expect("failed to create stream_gateway_cache_lookups_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_gateway_cache_lookups_total");
    counter
});

static ORIGIN_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "stream_gateway_origin_failures_total",
            "Failed origin media path lookups by kind",
        ),
        &["kind"],
    )
    .expect("failed to create stream_gateway_origin_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_gateway_origin_failures_total");
    counter
});

static OVERRIDES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "stream_gateway_overrides_total",
            "Requests served from special media, by rule key",
        ),
        &["key"],
    )
    .expect("failed to create stream_gateway_overrides_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register stream_gateway_overrides_total");
    counter
});

pub fn observe_stream_request(outcome: &str, elapsed: Duration) {
    STREAM_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    STREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(elapsed.as_secs_f64());
}

pub fn record_cache_lookup(result: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_origin_failure(kind: &str) {
    ORIGIN_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

/// `key` is the rule key, `MediaMissing` for fallbacks
pub fn record_override(key: &str) {
    OVERRIDES_TOTAL.with_label_values(&[key]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
