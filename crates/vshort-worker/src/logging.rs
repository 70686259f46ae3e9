//! Per-request logging for the short workflow.
//!
//! Every event carries the request id and the workflow operation, so a single
//! `create` or `refresh` can be followed through interleaved poll logs.

use tokio::time::Instant;
use tracing::{error, info, warn, Span};

use vshort_models::{ShortResult, ShortStatus};

/// Logger bound to one workflow run.
#[derive(Debug, Clone)]
pub struct JobLogger {
    request_id: String,
    operation: &'static str,
    started: Instant,
}

impl JobLogger {
    /// `request_id` is a fresh UUID for new shorts, or the backend job id
    /// when refreshing.
    pub fn new(request_id: impl Into<String>, operation: &'static str) -> Self {
        Self {
            request_id: request_id.into(),
            operation,
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Metric label of the workflow.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Seconds since the logger was created.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request error: {}", message
        );
    }

    /// Log the result a run ended on, at a level matching its status.
    pub fn log_outcome(&self, result: &ShortResult) {
        let job_id = result.job_id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        let elapsed_secs = self.elapsed_secs();
        match result.status {
            ShortStatus::Completed => info!(
                request_id = %self.request_id,
                operation = self.operation,
                job_id,
                short_url = result.short_url.as_deref().unwrap_or_default(),
                elapsed_secs,
                "Short ready"
            ),
            ShortStatus::Timeout => warn!(
                request_id = %self.request_id,
                operation = self.operation,
                job_id,
                elapsed_secs,
                "Short still processing when polling stopped"
            ),
            ShortStatus::Error => error!(
                request_id = %self.request_id,
                operation = self.operation,
                job_id,
                error = result.error.as_deref().unwrap_or_default(),
                elapsed_secs,
                "Short failed"
            ),
            ShortStatus::Processing => warn!(
                request_id = %self.request_id,
                operation = self.operation,
                job_id,
                "Run ended without a terminal status"
            ),
        }
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vshort_models::JobId;

    #[tokio::test(start_paused = true)]
    async fn test_logger_tracks_elapsed_time() {
        let logger = JobLogger::new("req-123", "create_short");
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(logger.request_id(), "req-123");
        assert_eq!(logger.operation(), "create_short");
        assert_eq!(logger.elapsed_secs(), 1.5);
    }

    #[test]
    fn test_log_outcome_handles_every_status() {
        let logger = JobLogger::new("job-1", "force_refresh");
        let mut result = ShortResult::for_job(JobId::from("job-1"), "Checking job status");
        logger.log_outcome(&result);
        result.time_out(None, "still running");
        logger.log_outcome(&result);
        result.fail("source unavailable");
        logger.log_outcome(&result);
        result.complete("https://cdn.example/a.mp4", None);
        logger.log_outcome(&result);
        assert_eq!(result.status, ShortStatus::Completed);
    }
}
