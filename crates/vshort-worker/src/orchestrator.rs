//! Viral short workflow.
//!
//! Turns one request into a published `ShortResult`:
//! transcript, then scored candidates, then a segment extraction job for the
//! best candidate. Every state change is published wholesale to the result
//! store, and every run ends on a terminal status, including when a
//! collaborator panics.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use vshort_models::{
    fallback_candidates, rank_candidates, JobId, PollProgress, SegmentCandidate, ShortResult,
    SourceId,
};
use vshort_sieve::{
    PollObserver, RefreshOutcome, SegmentExtraction, SegmentFailure, SegmentJobClient,
    SieveCredentials,
};
use vshort_store::ResultStore;

use crate::collaborators::{SegmentScorer, TranscriptProvider};
use crate::logging::JobLogger;
use crate::metrics::{record_fallback, record_run, record_segment_attempt};

/// Default length of a short in seconds.
pub const DEFAULT_TARGET_DURATION: f64 = 15.0;

/// Default scoring style.
pub const DEFAULT_STYLE: &str = "trending";

/// A request to create one short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortRequest {
    /// Video id or URL
    pub source_id: String,
    #[serde(default = "default_target_duration")]
    pub target_duration: f64,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_target_duration() -> f64 {
    DEFAULT_TARGET_DURATION
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

impl ShortRequest {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_duration: DEFAULT_TARGET_DURATION,
            style: DEFAULT_STYLE.to_string(),
        }
    }

    pub fn with_target_duration(mut self, seconds: f64) -> Self {
        self.target_duration = seconds;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }
}

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Candidates tried, best first, before giving up
    pub max_segment_attempts: u32,
    /// Pause between consecutive segment jobs
    pub inter_request_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_segment_attempts: 1,
            inter_request_delay: Duration::from_secs(1),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_segment_attempts: std::env::var("MAX_SEGMENT_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1),
            inter_request_delay: Duration::from_millis(
                std::env::var("INTER_REQUEST_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
        }
    }
}

/// Coordinates transcript, scoring and segment extraction for a request.
pub struct ViralSegmentOrchestrator {
    transcripts: Arc<dyn TranscriptProvider>,
    scorer: Arc<dyn SegmentScorer>,
    segments: SegmentJobClient,
    store: Arc<dyn ResultStore>,
    credentials: SieveCredentials,
    config: OrchestratorConfig,
}

impl ViralSegmentOrchestrator {
    pub fn new(
        transcripts: Arc<dyn TranscriptProvider>,
        scorer: Arc<dyn SegmentScorer>,
        segments: SegmentJobClient,
        store: Arc<dyn ResultStore>,
        credentials: SieveCredentials,
    ) -> Self {
        Self {
            transcripts,
            scorer,
            segments,
            store,
            credentials,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a short for `request`.
    ///
    /// Always returns (and has published) a terminal result.
    pub async fn run(&self, request: &ShortRequest) -> ShortResult {
        let logger = JobLogger::new(Uuid::new_v4().to_string(), "create_short");
        let span = logger.create_span();
        let mut result = ShortResult::processing(request.source_id.trim(), "Fetching transcript");

        let outcome = AssertUnwindSafe(self.create(request, &mut result, &logger))
            .catch_unwind()
            .instrument(span)
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            logger.log_error(&format!("unexpected failure: {}", message));
            result.fail(format!("Unexpected error: {}", message));
            self.publish(&result).await;
        }
        logger.log_outcome(&result);
        record_run(logger.operation(), result.status.as_str(), logger.elapsed_secs());
        result
    }

    /// Re-check an earlier job by id without redoing transcript or scoring.
    ///
    /// A ready asset completes immediately; a pending job is polled again.
    pub async fn force_refresh(&self, job_id: &JobId) -> ShortResult {
        let logger = JobLogger::new(job_id.to_string(), "force_refresh");
        let span = logger.create_span();

        let mut result = match self.store.latest().await {
            Ok(Some(previous)) if previous.job_id.as_ref() == Some(job_id) => previous,
            Ok(_) => ShortResult::for_job(job_id.clone(), "Checking job status"),
            Err(e) => {
                warn!(error = %e, "Failed to load previous result");
                ShortResult::for_job(job_id.clone(), "Checking job status")
            }
        };

        let outcome = AssertUnwindSafe(self.refresh(job_id, &mut result, &logger))
            .catch_unwind()
            .instrument(span)
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            logger.log_error(&format!("unexpected failure: {}", message));
            result.fail(format!("Unexpected error: {}", message));
            self.publish(&result).await;
        }
        logger.log_outcome(&result);
        record_run(logger.operation(), result.status.as_str(), logger.elapsed_secs());
        result
    }

    async fn create(&self, request: &ShortRequest, result: &mut ShortResult, logger: &JobLogger) {
        logger.log_start(&format!("source {}", request.source_id));
        self.publish(result).await;

        let source = match SourceId::parse(&request.source_id) {
            Ok(source) => source,
            Err(e) => {
                logger.log_error(&e.to_string());
                result.fail(format!("Invalid video: {}", e));
                self.publish(result).await;
                return;
            }
        };
        result.video_id = Some(source.to_string());

        let transcript = match self.transcripts.fetch(&source).await {
            Ok(transcript) => transcript,
            Err(e) => {
                logger.log_error(&e.to_string());
                result.fail(format!("Failed to fetch transcript: {}", e));
                self.publish(result).await;
                return;
            }
        };

        result.set_processing("Analyzing transcript for viral segments");
        self.publish(result).await;

        let candidates = match self
            .scorer
            .score(&transcript, request.target_duration, &request.style)
            .await
        {
            Ok(candidates) if candidates.is_empty() => {
                logger.log_warning("scorer returned no segments, using fallback offsets");
                record_fallback();
                fallback_candidates()
            }
            Ok(candidates) => rank_candidates(candidates),
            Err(e) => {
                logger.log_error(&e.to_string());
                result.fail(format!("Failed to analyze transcript: {}", e));
                self.publish(result).await;
                return;
            }
        };
        logger.log_progress(&format!("{} candidate segments", candidates.len()));

        let attempts = candidates
            .len()
            .min(self.config.max_segment_attempts.max(1) as usize);
        let mut last_failure = None;

        for (index, candidate) in candidates.iter().take(attempts).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.inter_request_delay).await;
            }

            record_segment_attempt();
            result.set_candidate(candidate);
            result.set_processing("Extracting segment");
            self.publish(result).await;

            let duration = segment_duration(candidate, request.target_duration);
            let observer = ProgressPublisher::new(self.store.as_ref(), result);
            let extracted = self
                .segments
                .extract_segment_with_observer(
                    source.as_str(),
                    candidate.start_time,
                    duration,
                    &self.credentials,
                    &observer,
                )
                .await;

            match extracted {
                Ok(extraction) => {
                    self.complete(result, extraction, logger).await;
                    return;
                }
                Err(failure) => {
                    logger.log_warning(&format!(
                        "segment at {}s failed: {}",
                        candidate.start_time, failure
                    ));
                    last_failure = Some(failure);
                }
            }
        }

        match last_failure {
            Some(failure) => self.fail(result, failure, logger).await,
            None => {
                result.fail("No segments to extract");
                self.publish(result).await;
            }
        }
    }

    async fn refresh(&self, job_id: &JobId, result: &mut ShortResult, logger: &JobLogger) {
        logger.log_start("checking job status");
        result.set_job_id(job_id.clone());
        result.set_processing("Checking job status");
        self.publish(result).await;

        let outcome = match self.segments.refresh(job_id, &self.credentials).await {
            Ok(outcome) => outcome,
            Err(e) => {
                logger.log_error(&e.to_string());
                result.fail(e.to_string());
                self.publish(result).await;
                return;
            }
        };

        match outcome {
            RefreshOutcome::Ready(extraction) => self.complete(result, extraction, logger).await,
            RefreshOutcome::Failed(failure) => self.fail(result, failure, logger).await,
            RefreshOutcome::Pending { status_label } => {
                logger.log_progress(&format!("job is {}, resuming polling", status_label));
                result.set_processing(format!("Job is {}, waiting for the video", status_label));
                self.publish(result).await;

                let observer = ProgressPublisher::new(self.store.as_ref(), result);
                match self
                    .segments
                    .resume(job_id, &self.credentials, &observer)
                    .await
                {
                    Ok(extraction) => self.complete(result, extraction, logger).await,
                    Err(failure) => self.fail(result, failure, logger).await,
                }
            }
        }
    }

    async fn complete(
        &self,
        result: &mut ShortResult,
        extraction: SegmentExtraction,
        logger: &JobLogger,
    ) {
        logger.log_progress(&format!("job {} produced {}", extraction.job_id, extraction.url));
        result.complete(extraction.url, Some(extraction.job_id));
        self.publish(result).await;
    }

    async fn fail(&self, result: &mut ShortResult, failure: SegmentFailure, logger: &JobLogger) {
        logger.log_error(&failure.error);
        if failure.timed_out {
            result.time_out(failure.job_id, failure.error);
        } else {
            if let Some(job_id) = failure.job_id {
                result.set_job_id(job_id);
            }
            result.fail(failure.error);
        }
        self.publish(result).await;
    }

    /// Publish the current state; store failures are logged, never raised.
    async fn publish(&self, result: &ShortResult) {
        if let Err(e) = self.store.publish(result).await {
            warn!(status = %result.status, error = %e, "Failed to publish short result");
        }
    }
}

/// Requested clip length, falling back to the target when the candidate
/// range is empty.
fn segment_duration(candidate: &SegmentCandidate, target_duration: f64) -> f64 {
    let duration = candidate.duration();
    if duration > 0.0 {
        duration
    } else {
        target_duration
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Republishes the result while a job is polled, once per status change.
struct ProgressPublisher<'a> {
    store: &'a dyn ResultStore,
    snapshot: Mutex<ShortResult>,
    last_label: Mutex<Option<String>>,
}

impl<'a> ProgressPublisher<'a> {
    fn new(store: &'a dyn ResultStore, result: &ShortResult) -> Self {
        Self {
            store,
            snapshot: Mutex::new(result.clone()),
            last_label: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PollObserver for ProgressPublisher<'_> {
    async fn on_progress(&self, progress: &PollProgress) {
        let label = progress.status_label().to_string();
        let update = {
            let Ok(mut last) = self.last_label.lock() else {
                return;
            };
            if last.as_deref() == Some(label.as_str()) {
                None
            } else {
                *last = Some(label.clone());
                self.snapshot.lock().ok().map(|mut snapshot| {
                    snapshot.set_processing(format!(
                        "Extracting segment ({}, attempt {}/{})",
                        label, progress.attempt, progress.max_attempts
                    ));
                    snapshot.clone()
                })
            }
        };

        if let Some(snapshot) = update {
            debug!(status = %label, attempt = progress.attempt, "Publishing poll progress");
            if let Err(e) = self.store.publish(&snapshot).await {
                warn!(error = %e, "Failed to publish poll progress");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: ShortRequest = serde_json::from_str(r#"{"sourceId": "dQw4w9WgXcQ"}"#).unwrap();
        assert_eq!(request.target_duration, 15.0);
        assert_eq!(request.style, "trending");
        assert_eq!(request, ShortRequest::new("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_segment_duration_falls_back_to_target() {
        let empty = SegmentCandidate::new(30.0, 30.0, 50.0);
        assert_eq!(segment_duration(&empty, 15.0), 15.0);
        let normal = SegmentCandidate::new(30.0, 50.0, 50.0);
        assert_eq!(segment_duration(&normal, 15.0), 20.0);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
