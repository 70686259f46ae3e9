//! Sieve backend metrics.
//!
//! Counters are no-ops unless the binary installs a recorder:
//! - Job submissions by result
//! - Poll attempts by backend status label
//! - Poll outcomes by kind, with polling duration

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total job submissions by result.
    pub const SUBMISSIONS_TOTAL: &str = "sieve_submissions_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "sieve_retries_total";

    /// Total status polls by backend status label.
    pub const POLL_ATTEMPTS_TOTAL: &str = "sieve_poll_attempts_total";

    /// Total finished polling loops by outcome kind.
    pub const POLL_OUTCOMES_TOTAL: &str = "sieve_poll_outcomes_total";

    /// Time spent polling one job, in seconds.
    pub const POLL_DURATION_SECONDS: &str = "sieve_poll_duration_seconds";
}

/// Record a job submission.
pub fn record_submission(success: bool) {
    let result = if success { "accepted" } else { "rejected" };
    counter!(names::SUBMISSIONS_TOTAL, "result" => result).increment(1);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Record one poll attempt.
pub fn record_poll_attempt(status: &str) {
    counter!(names::POLL_ATTEMPTS_TOTAL, "status" => status.to_string()).increment(1);
}

/// Record the end of a polling loop.
pub fn record_poll_outcome(kind: &'static str, elapsed_secs: f64) {
    counter!(names::POLL_OUTCOMES_TOTAL, "outcome" => kind).increment(1);
    histogram!(names::POLL_DURATION_SECONDS, "outcome" => kind).record(elapsed_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::SUBMISSIONS_TOTAL.starts_with("sieve_"));
        assert!(names::POLL_ATTEMPTS_TOTAL.contains("attempts"));
        assert!(names::POLL_OUTCOMES_TOTAL.contains("outcomes"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_submission(true);
        record_poll_attempt("running");
        record_poll_outcome("completed", 1.5);
    }
}
