//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog refresh (mirror list and catalog transfers, decoding, import)
//! - Catalog store (imported shows, import duration, skipped records)
//! - Lazy view (show cache hits and misses)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Sync - Refresh Metrics
// =============================================================================

/// Refresh attempts total by stage and result.
pub static REFRESH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediathek_refresh_attempts_total",
            "Total refresh attempts",
        ),
        &["stage", "result"], // stage: "mirror_list", "catalog"; result: "success", "failure"
    )
    .unwrap()
});

/// Refresh cycles skipped because one was already in flight.
pub static REFRESH_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediathek_refresh_skipped_total",
        "Refresh cycles skipped while another was running",
    )
    .unwrap()
});

/// Bytes received from remote transfers.
pub static DOWNLOADED_BYTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediathek_downloaded_bytes_total",
            "Total bytes downloaded",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Duration of a full catalog refresh (download, decode, parse, import).
pub static CATALOG_REFRESH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "mediathek_catalog_refresh_duration_seconds",
            "Duration of catalog refreshes",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
    )
    .unwrap()
});

// =============================================================================
// Catalog - Store Metrics
// =============================================================================

/// Shows written by catalog imports.
pub static CATALOG_SHOWS_IMPORTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediathek_catalog_shows_imported_total",
        "Total shows imported into the catalog",
    )
    .unwrap()
});

/// Records dropped by the catalog parser.
pub static CATALOG_RECORDS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediathek_catalog_records_skipped_total",
        "Total malformed catalog records skipped",
    )
    .unwrap()
});

/// Catalog import duration in seconds.
pub static CATALOG_IMPORT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "mediathek_catalog_import_duration_seconds",
            "Duration of catalog snapshot imports",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .unwrap()
});

// =============================================================================
// View - Cache Metrics
// =============================================================================

/// Show cache lookups by result.
pub static VIEW_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediathek_view_cache_lookups_total",
            "Show cache lookups",
        ),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sync
        Box::new(REFRESH_ATTEMPTS.clone()),
        Box::new(REFRESH_SKIPPED.clone()),
        Box::new(DOWNLOADED_BYTES.clone()),
        Box::new(CATALOG_REFRESH_DURATION.clone()),
        // Catalog
        Box::new(CATALOG_SHOWS_IMPORTED.clone()),
        Box::new(CATALOG_RECORDS_SKIPPED.clone()),
        Box::new(CATALOG_IMPORT_DURATION.clone()),
        // View
        Box::new(VIEW_CACHE_LOOKUPS.clone()),
    ]
}
