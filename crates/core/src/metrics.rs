//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery calls (outcome status, duration, records returned)
//! - Source fetches
//! - Extraction attempts per strategy
//! - LLM token usage

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Discovery calls total by terminal status.
pub static DISCOVERY_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scout_discovery_calls_total", "Total discovery calls"),
        &["status"], // "found", "no_matches", "all_sources_failed", ...
    )
    .unwrap()
});

/// Discovery duration in seconds, scrape start to terminal state.
pub static DISCOVERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "scout_discovery_duration_seconds",
            "Duration of a discovery call",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["status"],
    )
    .unwrap()
});

/// Records returned per discovery call.
pub static RECORDS_RETURNED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "scout_records_returned",
            "Number of torrent records returned per discovery call",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Source & Extraction Metrics
// =============================================================================

/// Source fetches by source and result.
pub static SOURCE_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scout_source_fetches_total", "Total source page fetches"),
        &["source", "status"], // status: "success", "error", "deadline"
    )
    .unwrap()
});

/// Extraction attempts by strategy and result.
pub static EXTRACTION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "scout_extraction_attempts_total",
            "Total extraction attempts",
        ),
        &["strategy", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scout_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(DISCOVERY_CALLS.clone()),
        Box::new(DISCOVERY_DURATION.clone()),
        Box::new(RECORDS_RETURNED.clone()),
        Box::new(SOURCE_FETCHES.clone()),
        Box::new(EXTRACTION_ATTEMPTS.clone()),
        Box::new(LLM_TOKENS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register_without_conflict() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        DISCOVERY_CALLS.with_label_values(&["found"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "scout_discovery_calls_total"));
    }

    #[test]
    fn test_records_returned_is_unlabeled() {
        let registry = Registry::new();
        registry
            .register(Box::new(RECORDS_RETURNED.clone()))
            .unwrap();

        RECORDS_RETURNED.observe(3.0);
        let families = registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "scout_records_returned")
            .unwrap();
        let metric = &family.get_metric()[0];
        assert!(metric.get_label().is_empty());
        assert!(metric.get_histogram().get_sample_count() >= 1);
    }
}
