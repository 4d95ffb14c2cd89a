//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (results, tool durations)
//! - Cache (lookups by outcome, evictions, bytes held)
//! - Task queue (pending and processing tasks)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversions
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filemill_conversions_total", "Total conversions"),
        &["result"], // "success", "cache_hit", or an error kind
    )
    .unwrap()
});

/// Time spent inside an external tool.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "filemill_conversion_duration_seconds",
            "Duration of external tool runs",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["tool"],
    )
    .unwrap()
});

// =============================================================================
// Cache
// =============================================================================

/// Cache lookups by outcome.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filemill_cache_lookups_total", "Total cache lookups"),
        &["result"], // "hit", "miss", "expired", "missing_file"
    )
    .unwrap()
});

/// Entries removed to stay under the size cap.
pub static CACHE_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("filemill_cache_evictions_total", "Total cache evictions").unwrap()
});

/// Bytes referenced by the cache index.
pub static CACHE_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("filemill_cache_bytes", "Bytes held by cached artifacts").unwrap()
});

// =============================================================================
// Task queue
// =============================================================================

pub static TASKS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("filemill_tasks_pending", "Tasks waiting for a slot").unwrap()
});

pub static TASKS_PROCESSING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("filemill_tasks_processing", "Tasks currently running").unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_EVICTIONS.clone()),
        Box::new(CACHE_BYTES.clone()),
        Box::new(TASKS_PENDING.clone()),
        Box::new(TASKS_PROCESSING.clone()),
    ]
}
