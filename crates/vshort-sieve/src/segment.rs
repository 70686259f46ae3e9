//! Segment extraction jobs.
//!
//! `SegmentJobClient` submits a clip request for one time range of a source
//! video, then polls until the backend hands back an asset URL.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use vshort_models::{BackendJobStatus, JobHandle, JobId, PollOutcome, SourceId, TimeRange};

use crate::backend::{JobBackend, SieveCredentials};
use crate::error::{SieveError, SieveResult};
use crate::extract;
use crate::metrics;
use crate::poller::{failure_reason, JobPoller, NoopObserver, PollObserver, PollerConfig};
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// A finished segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentExtraction {
    /// Downloadable asset URL
    pub url: String,
    /// Raw status payload the URL was found in
    pub metadata: Value,
    pub job_id: JobId,
}

/// A segment that could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct SegmentFailure {
    pub error: String,
    /// Set once the backend accepted the job
    pub job_id: Option<JobId>,
    /// Polling ran out of attempts; the job may still finish
    pub timed_out: bool,
}

impl SegmentFailure {
    fn rejected(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            job_id: None,
            timed_out: false,
        }
    }

    fn failed(error: impl Into<String>, job_id: JobId) -> Self {
        Self {
            error: error.into(),
            job_id: Some(job_id),
            timed_out: false,
        }
    }

    fn timed_out(job_id: JobId) -> Self {
        Self {
            error: format!(
                "Job {} is taking longer than expected. Check back later.",
                job_id
            ),
            job_id: Some(job_id),
            timed_out: true,
        }
    }
}

/// Result of a single status check on an existing job.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The asset is available
    Ready(SegmentExtraction),
    /// The backend reported failure
    Failed(SegmentFailure),
    /// No asset yet; `status_label` is the backend's current status
    Pending { status_label: String },
}

/// Client for segment extraction jobs.
#[derive(Clone)]
pub struct SegmentJobClient {
    backend: Arc<dyn JobBackend>,
    poller: JobPoller,
    submit_retry: RetryConfig,
}

impl SegmentJobClient {
    pub fn new(backend: Arc<dyn JobBackend>, poller_config: PollerConfig) -> Self {
        Self {
            backend,
            poller: JobPoller::new(poller_config),
            submit_retry: RetryConfig::new("sieve_submit"),
        }
    }

    /// Override the submission retry policy.
    pub fn with_submit_retry(mut self, submit_retry: RetryConfig) -> Self {
        self.submit_retry = submit_retry;
        self
    }

    /// Extract `[start_time, start_time + duration]` of a source video.
    pub async fn extract_segment(
        &self,
        source_id: &str,
        start_time: f64,
        duration: f64,
        credentials: &SieveCredentials,
    ) -> Result<SegmentExtraction, SegmentFailure> {
        self.extract_segment_with_observer(
            source_id,
            start_time,
            duration,
            credentials,
            &NoopObserver,
        )
        .await
    }

    /// Like [`extract_segment`](Self::extract_segment), reporting poll
    /// progress to `observer`.
    pub async fn extract_segment_with_observer(
        &self,
        source_id: &str,
        start_time: f64,
        duration: f64,
        credentials: &SieveCredentials,
        observer: &dyn PollObserver,
    ) -> Result<SegmentExtraction, SegmentFailure> {
        let source = validate_request(source_id, start_time, duration, credentials)
            .map_err(|e| SegmentFailure::rejected(e.to_string()))?;
        let range = TimeRange::new(start_time, duration);

        let submitted = retry_async(
            &self.submit_retry,
            || {
                self.backend
                    .submit(&source, range.start_time, range.end_time(), credentials)
            },
            SieveError::is_retryable,
        )
        .await;

        let job = match submitted {
            RetryResult::Success(job) => {
                metrics::record_submission(true);
                job
            }
            RetryResult::Failed { error, attempts } => {
                metrics::record_submission(false);
                warn!(source = %source, attempts, error = %error, "Segment submission failed");
                return Err(SegmentFailure::rejected(error.to_string()));
            }
        };

        let handle = JobHandle::new(job.id, source.as_str(), range);
        info!(
            job_id = %handle.job_id,
            source = %handle.source_id,
            start_time = handle.requested_range.start_time,
            duration = handle.requested_range.duration,
            "Polling segment job"
        );

        self.await_job(&handle.job_id, credentials, observer).await
    }

    /// Check an existing job once, without polling.
    pub async fn refresh(
        &self,
        job_id: &JobId,
        credentials: &SieveCredentials,
    ) -> SieveResult<RefreshOutcome> {
        validate_job(job_id, credentials)?;

        let response = match self.backend.fetch_status(job_id, credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Refresh fetch failed");
                return Ok(RefreshOutcome::Pending {
                    status_label: "unreachable".to_string(),
                });
            }
        };

        if !response.is_success() {
            return Ok(RefreshOutcome::Pending {
                status_label: format!("http {}", response.http_status),
            });
        }

        let parsed = serde_json::from_str::<Value>(&response.body_text).ok();
        if let Some(url) = extract::extract_parsed(parsed.as_ref(), &response.body_text) {
            return Ok(RefreshOutcome::Ready(SegmentExtraction {
                url,
                metadata: parsed.unwrap_or(Value::Null),
                job_id: job_id.clone(),
            }));
        }

        let status = parsed
            .as_ref()
            .map(BackendJobStatus::from_payload)
            .unwrap_or_else(|| BackendJobStatus::Unknown(String::new()));
        if status == BackendJobStatus::Failed {
            let reason = parsed.as_ref().map(failure_reason).unwrap_or_default();
            return Ok(RefreshOutcome::Failed(SegmentFailure::failed(
                reason,
                job_id.clone(),
            )));
        }

        Ok(RefreshOutcome::Pending {
            status_label: status.as_str().to_string(),
        })
    }

    /// Re-enter polling for a job submitted earlier.
    pub async fn resume(
        &self,
        job_id: &JobId,
        credentials: &SieveCredentials,
        observer: &dyn PollObserver,
    ) -> Result<SegmentExtraction, SegmentFailure> {
        validate_job(job_id, credentials).map_err(|e| SegmentFailure::rejected(e.to_string()))?;
        self.await_job(job_id, credentials, observer).await
    }

    async fn await_job(
        &self,
        job_id: &JobId,
        credentials: &SieveCredentials,
        observer: &dyn PollObserver,
    ) -> Result<SegmentExtraction, SegmentFailure> {
        let outcome = self
            .poller
            .poll_backend(self.backend.as_ref(), job_id, credentials, observer)
            .await;

        match outcome {
            PollOutcome::Completed {
                asset_url,
                raw_status,
            } => Ok(SegmentExtraction {
                url: asset_url,
                metadata: raw_status,
                job_id: job_id.clone(),
            }),
            PollOutcome::Failed { reason } => Err(SegmentFailure::failed(reason, job_id.clone())),
            PollOutcome::TimedOut { job_id, .. } => Err(SegmentFailure::timed_out(job_id)),
            PollOutcome::InProgress { status_label, .. } => Err(SegmentFailure::failed(
                format!("Polling stopped while job was {}", status_label),
                job_id.clone(),
            )),
        }
    }
}

fn validate_request(
    source_id: &str,
    start_time: f64,
    duration: f64,
    credentials: &SieveCredentials,
) -> SieveResult<SourceId> {
    if source_id.trim().is_empty() {
        return Err(SieveError::invalid_request("Video id is required"));
    }
    if credentials.is_empty() {
        return Err(SieveError::invalid_request("Sieve API key is required"));
    }
    if !start_time.is_finite() || start_time < 0.0 {
        return Err(SieveError::invalid_request(format!(
            "Start time must be a non-negative number of seconds, got {}",
            start_time
        )));
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SieveError::invalid_request(format!(
            "Duration must be positive, got {}",
            duration
        )));
    }
    SourceId::parse(source_id).map_err(|e| SieveError::invalid_request(e.to_string()))
}

fn validate_job(job_id: &JobId, credentials: &SieveCredentials) -> SieveResult<()> {
    if job_id.is_empty() {
        return Err(SieveError::invalid_request("Job id is required"));
    }
    if credentials.is_empty() {
        return Err(SieveError::invalid_request("Sieve API key is required"));
    }
    Ok(())
}
