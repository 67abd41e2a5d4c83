//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Submissions (outcomes, step attempts, retries)
//! - Scorecard analysis (confidence, review flags)
//! - External services (league site, vision service)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Submission Metrics
// =============================================================================

/// Submissions by aggregate outcome.
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scorecard_submissions_total", "Total match submissions"),
        &["status"], // "success", "partial_success", "failed", "cancelled"
    )
    .unwrap()
});

/// Submission duration in seconds.
pub static SUBMISSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "scorecard_submission_duration_seconds",
            "Duration of a full validate/submit/upload run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["status"],
    )
    .unwrap()
});

/// Step results by step and status.
pub static SUBMISSION_STEPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scorecard_submission_steps_total", "Submission step results"),
        &["step", "status"], // step: "validate", "submit", "upload"
    )
    .unwrap()
});

/// Backoff retries by operation.
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("scorecard_retry_attempts_total", "Retries after a failed attempt"),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Analysis Metrics
// =============================================================================

/// Confidence reported by the vision service.
pub static ANALYSIS_CONFIDENCE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "scorecard_analysis_confidence",
            "Distribution of scorecard analysis confidence",
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
        &[],
    )
    .unwrap()
});

/// Analyses flagged for human review.
pub static ANALYSES_NEEDING_REVIEW: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "scorecard_analyses_needing_review_total",
        "Analyses below the confidence threshold or with inconsistencies",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "scorecard_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"], // service: "league_site", "vision"
    )
    .unwrap()
});

/// External service requests by outcome.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "scorecard_external_service_requests_total",
            "External service requests",
        ),
        &["service", "operation", "result"], // result: "ok", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one external call.
pub fn observe_external_call(service: &str, operation: &str, seconds: f64, ok: bool) {
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(seconds);
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, if ok { "ok" } else { "error" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Submissions
        Box::new(SUBMISSIONS_TOTAL.clone()),
        Box::new(SUBMISSION_DURATION.clone()),
        Box::new(SUBMISSION_STEPS.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
        // Analysis
        Box::new(ANALYSIS_CONFIDENCE.clone()),
        Box::new(ANALYSES_NEEDING_REVIEW.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
