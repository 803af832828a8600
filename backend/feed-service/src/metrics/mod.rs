//! Prometheus metrics for feed-service.
//!
//! Exposes feed-specific collectors and an HTTP handler for the `/metrics`
//! endpoint.
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Duration of feed page requests by source (cache, recompute).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_request_duration_seconds",
        "Feed request duration segmented by data source",
        &["source"]
    )
    .expect("failed to register feed_request_duration_seconds");

    /// Total feed page requests by source.
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Total feed requests segmented by data source",
        &["source"]
    )
    .expect("failed to register feed_request_total");

    /// Feed cache events (hit/miss/error).
    pub static ref FEED_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "feed_cache_events_total",
        "Feed cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register feed_cache_events_total");

    /// Feed cache write results (success/error).
    pub static ref FEED_CACHE_WRITE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_cache_write_total",
        "Feed cache write attempts segmented by outcome",
        &["result"]
    )
    .expect("failed to register feed_cache_write_total");

    /// Invalidation sweeps triggered by engagement mutations.
    pub static ref FEED_INVALIDATION_TOTAL: IntCounter = register_int_counter!(
        "feed_invalidation_total",
        "Total feed cache invalidation sweeps"
    )
    .expect("failed to register feed_invalidation_total");

    /// Viewer overlay lookups that degraded to default flags.
    pub static ref FEED_OVERLAY_DEGRADED_TOTAL: IntCounter = register_int_counter!(
        "feed_overlay_degraded_total",
        "Viewer flag lookups that failed and degraded to defaults"
    )
    .expect("failed to register feed_overlay_degraded_total");
}

/// Actix handler that renders Prometheus metrics in text format.
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
