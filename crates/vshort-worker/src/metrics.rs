//! Workflow metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Finished workflow runs by operation and terminal status.
    pub const RUNS_TOTAL: &str = "vshort_runs_total";

    /// Wall time of one workflow run, in seconds.
    pub const RUN_DURATION_SECONDS: &str = "vshort_run_duration_seconds";

    /// Candidate segments tried per run.
    pub const SEGMENT_ATTEMPTS_TOTAL: &str = "vshort_segment_attempts_total";

    /// Runs that fell back to fixed candidate offsets.
    pub const FALLBACK_CANDIDATES_TOTAL: &str = "vshort_fallback_candidates_total";
}

/// Record a finished run.
pub fn record_run(operation: &'static str, status: &'static str, elapsed_secs: f64) {
    counter!(names::RUNS_TOTAL, "operation" => operation, "status" => status).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, "operation" => operation).record(elapsed_secs);
}

pub fn record_segment_attempt() {
    counter!(names::SEGMENT_ATTEMPTS_TOTAL).increment(1);
}

pub fn record_fallback() {
    counter!(names::FALLBACK_CANDIDATES_TOTAL).increment(1);
}
