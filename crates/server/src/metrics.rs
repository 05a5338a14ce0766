//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the mediathek server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Catalog size and sync state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediathek_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediathek_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediathek_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediathek_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediathek_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediathek_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediathek_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Catalog and Sync Metrics (collected dynamically)
// =============================================================================

/// Shows in the current catalog snapshot.
pub static CATALOG_SHOWS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediathek_catalog_shows",
        "Number of shows in the current catalog snapshot",
    )
    .unwrap()
});

/// Current snapshot generation.
pub static CATALOG_GENERATION: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediathek_catalog_generation",
        "Generation of the current catalog snapshot",
    )
    .unwrap()
});

/// Whether a refresh cycle is in flight (1) or not (0).
pub static SYNC_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediathek_sync_in_flight",
        "Whether a catalog refresh cycle is in flight",
    )
    .unwrap()
});

pub static SYNC_MIRRORS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mediathek_sync_mirrors", "Known catalog mirrors").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Catalog and sync
    registry.register(Box::new(CATALOG_SHOWS.clone())).unwrap();
    registry
        .register(Box::new(CATALOG_GENERATION.clone()))
        .unwrap();
    registry.register(Box::new(SYNC_IN_FLIGHT.clone())).unwrap();
    registry.register(Box::new(SYNC_MIRRORS.clone())).unwrap();

    // Core metrics (refresh, import, view cache)
    for metric in mediathek_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges from the current catalog and sync state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(stats) = state.catalog().stats() {
        CATALOG_SHOWS.set(stats.total_shows as i64);
        CATALOG_GENERATION.set(stats.generation as i64);
    }

    let status = state.sync().status();
    SYNC_IN_FLIGHT.set(if status.in_flight { 1 } else { 0 });
    SYNC_MIRRORS.set(status.mirrors as i64);
}

/// Normalize a path for metric labels (replace numeric ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    // Runs twice so adjacent segments like /1/2 both match.
    let result = NUMERIC.replace_all(path, "/{id}$1");
    NUMERIC.replace_all(&result, "/{id}$1").to_string()
}
