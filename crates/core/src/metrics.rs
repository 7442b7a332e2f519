//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (runs, stages)
//! - Poller (render polls and outcomes)
//! - External services (requests, durations, script tokens, quota rejections)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs finished, by terminal status.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsreel_runs_total", "Total pipeline runs by final status"),
        &["status"], // "done", "error", "cancelled"
    )
    .unwrap()
});

/// Runs rejected because another run was active.
pub static RUNS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "newsreel_runs_rejected_total",
        "Run requests rejected because a run was already active",
    )
    .unwrap()
});

/// End-to-end run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("newsreel_run_duration_seconds", "Duration of pipeline runs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["status"],
    )
    .unwrap()
});

/// Per-stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "newsreel_stage_duration_seconds",
            "Duration of individual pipeline stages",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Poller
// =============================================================================

/// Status polls issued against the avatar renderer.
pub static RENDER_POLLS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("newsreel_render_polls_total", "Total render status polls").unwrap()
});

/// Render jobs by outcome.
pub static RENDER_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsreel_render_outcomes_total", "Render jobs by outcome"),
        &["outcome"], // "completed", "failed", "timeout", "cancelled", "error"
    )
    .unwrap()
});

// =============================================================================
// External Services
// =============================================================================

/// External service call duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "newsreel_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "newsreel_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Tokens reported by the script rephraser.
pub static SCRIPT_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("newsreel_script_tokens_total", "Script model token usage"),
        &["type"], // "input", "output"
    )
    .unwrap()
});

/// Calls refused by the daily quota.
pub static QUOTA_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "newsreel_quota_rejections_total",
            "Calls refused because the daily limit was reached",
        ),
        &["service"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUNS_REJECTED.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(STAGE_DURATION.clone()),
        // Poller
        Box::new(RENDER_POLLS.clone()),
        Box::new(RENDER_OUTCOMES.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(SCRIPT_TOKENS.clone()),
        Box::new(QUOTA_REJECTIONS.clone()),
    ]
}
