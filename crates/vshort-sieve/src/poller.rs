//! Job status polling.
//!
//! The backend reports progress through a loose status vocabulary and
//! sometimes marks a job finished before its outputs are attached. The poller
//! drives one job to a terminal [`PollOutcome`], adapting the delay to what
//! each response says:
//!
//! | response                    | next delay        |
//! |-----------------------------|-------------------|
//! | completed, no URL yet       | base x 0.5        |
//! | running / unknown / network | base x 1.0        |
//! | queued                      | base x 1.5        |
//! | HTTP 5xx                    | base x 2.0        |
//!
//! Errors never escape the loop; every failure mode maps to an outcome.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use vshort_models::{BackendJobStatus, JobId, PollOutcome, PollProgress, StatusResponse};

use crate::backend::{JobBackend, SieveCredentials};
use crate::error::SieveResult;
use crate::extract;
use crate::metrics;
use crate::retry::FailureTracker;

/// Polling configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum status fetches before giving up
    pub max_attempts: u32,
    /// Delay multiplied by the backoff factor of each response
    pub base_delay: Duration,
    /// Consecutive completed-without-URL responses tolerated
    pub max_completed_without_url: u32,
    /// Consecutive fetch failures logged before suppression
    pub max_logged_failures: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            base_delay: Duration::from_millis(5000),
            max_completed_without_url: 5,
            max_logged_failures: 3,
        }
    }
}

impl PollerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("SIEVE_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            base_delay: std::env::var("SIEVE_POLL_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            ..defaults
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

/// Receives progress between poll attempts.
#[async_trait]
pub trait PollObserver: Send + Sync {
    async fn on_progress(&self, progress: &PollProgress);
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl PollObserver for NoopObserver {
    async fn on_progress(&self, _progress: &PollProgress) {}
}

/// Delay factor chosen from the last response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    /// Completed without outputs; they usually land shortly.
    Accelerated,
    Normal,
    Queued,
    ServerError,
}

impl Backoff {
    /// Multiplier in halves, so delays stay exact.
    fn halves(self) -> u32 {
        match self {
            Backoff::Accelerated => 1,
            Backoff::Normal => 2,
            Backoff::Queued => 3,
            Backoff::ServerError => 4,
        }
    }

    fn delay(self, base: Duration) -> Duration {
        base.saturating_mul(self.halves()) / 2
    }
}

/// What to do after one status response.
enum Step {
    Finish(PollOutcome),
    Continue(Backoff),
}

/// Drives a single backend job to a terminal outcome.
#[derive(Debug, Clone, Default)]
pub struct JobPoller {
    config: PollerConfig,
}

impl JobPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll a job through a backend.
    pub async fn poll_backend(
        &self,
        backend: &dyn JobBackend,
        job_id: &JobId,
        credentials: &SieveCredentials,
        observer: &dyn PollObserver,
    ) -> PollOutcome {
        self.poll(job_id, || backend.fetch_status(job_id, credentials), observer)
            .await
    }

    /// Poll a job using `fetch_status` for each attempt.
    ///
    /// Returns `Completed`, `Failed` or `TimedOut`; never `InProgress`.
    pub async fn poll<F, Fut>(
        &self,
        job_id: &JobId,
        mut fetch_status: F,
        observer: &dyn PollObserver,
    ) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SieveResult<StatusResponse>>,
    {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts;
        let mut failures = FailureTracker::new(self.config.max_logged_failures);
        let mut completed_without_url = 0u32;
        let mut last_raw_response: Option<String> = None;

        for attempt in 1..=max_attempts {
            let step = match fetch_status().await {
                Err(e) => {
                    if failures.record_failure() {
                        warn!(job_id = %job_id, attempt, error = %e, "Status fetch failed");
                    }
                    metrics::record_poll_attempt("fetch_error");
                    Step::Continue(Backoff::Normal)
                }
                Ok(response) if !response.is_success() => {
                    if failures.record_failure() {
                        warn!(
                            job_id = %job_id,
                            attempt,
                            status = response.http_status,
                            "Status request returned an error"
                        );
                    }
                    metrics::record_poll_attempt("http_error");
                    if response.is_server_error() {
                        Step::Continue(Backoff::ServerError)
                    } else {
                        Step::Continue(Backoff::Normal)
                    }
                }
                Ok(response) => {
                    failures.record_success();
                    let step = self
                        .inspect(
                            job_id,
                            attempt,
                            &response.body_text,
                            &mut completed_without_url,
                            observer,
                        )
                        .await;
                    last_raw_response = Some(response.body_text);
                    step
                }
            };

            match step {
                Step::Finish(outcome) => return finish(job_id, outcome, started),
                Step::Continue(backoff) if attempt < max_attempts => {
                    let delay = backoff.delay(self.config.base_delay);
                    debug!(job_id = %job_id, attempt, ?delay, "Waiting before next poll");
                    tokio::time::sleep(delay).await;
                }
                Step::Continue(_) => {}
            }
        }

        warn!(job_id = %job_id, max_attempts, "Polling gave up before the job finished");
        finish(
            job_id,
            PollOutcome::TimedOut {
                job_id: job_id.clone(),
                last_raw_response,
            },
            started,
        )
    }

    /// Interpret one successful status body.
    async fn inspect(
        &self,
        job_id: &JobId,
        attempt: u32,
        body: &str,
        completed_without_url: &mut u32,
        observer: &dyn PollObserver,
    ) -> Step {
        let payload = match serde_json::from_str::<Value>(body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job_id, attempt, error = %e, "Status body is not JSON");
                metrics::record_poll_attempt("unparseable");
                return Step::Continue(Backoff::Normal);
            }
        };

        let status = BackendJobStatus::from_payload(&payload);
        metrics::record_poll_attempt(status.as_str());
        debug!(job_id = %job_id, attempt, status = %status, "Polled job status");

        match status {
            BackendJobStatus::Completed => {
                let outcome = extract::extract_parsed(Some(&payload), body)
                    .and_then(|url| PollOutcome::completed(url, payload.clone()));
                if let Some(outcome) = outcome {
                    return Step::Finish(outcome);
                }

                *completed_without_url += 1;
                warn!(
                    job_id = %job_id,
                    attempt,
                    streak = *completed_without_url,
                    "Job completed but no asset URL found yet"
                );
                if *completed_without_url >= self.config.max_completed_without_url {
                    return Step::Finish(PollOutcome::failed(format!(
                        "Job completed but no video URL was found after {} checks",
                        completed_without_url
                    )));
                }
                Step::Continue(Backoff::Accelerated)
            }
            BackendJobStatus::Failed => Step::Finish(PollOutcome::failed(failure_reason(&payload))),
            other => {
                *completed_without_url = 0;
                let progress = PollProgress::new(
                    attempt,
                    self.config.max_attempts,
                    other.as_str(),
                    progress_fraction(&payload),
                );
                observer.on_progress(&progress).await;
                if other == BackendJobStatus::Queued {
                    Step::Continue(Backoff::Queued)
                } else {
                    Step::Continue(Backoff::Normal)
                }
            }
        }
    }
}

fn finish(job_id: &JobId, outcome: PollOutcome, started: Instant) -> PollOutcome {
    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_poll_outcome(outcome.kind(), elapsed);
    info!(job_id = %job_id, outcome = outcome.kind(), elapsed_secs = elapsed, "Polling finished");
    outcome
}

/// Backend error message: `error` as a string, else `error.message`.
pub fn failure_reason(payload: &Value) -> String {
    let error = payload.get("error");
    error
        .and_then(Value::as_str)
        .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}

/// `progress` as a 0..1 fraction; percentages are scaled down.
fn progress_fraction(payload: &Value) -> Option<f64> {
    let raw = payload.get("progress").and_then(Value::as_f64)?;
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(fraction.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SieveError;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const URL: &str = "https://storage.googleapis.com/bucket/clip.mp4";

    fn poller(max_attempts: u32) -> JobPoller {
        JobPoller::new(
            PollerConfig::default()
                .with_max_attempts(max_attempts)
                .with_base_delay(Duration::from_millis(100)),
        )
    }

    fn ok(body: Value) -> SieveResult<StatusResponse> {
        Ok(StatusResponse::new(200, body.to_string()))
    }

    /// Serves scripted responses, repeating the last one when exhausted.
    struct Script {
        responses: Mutex<Vec<SieveResult<StatusResponse>>>,
        calls: AtomicU32,
    }

    impl Script {
        fn new(responses: Vec<SieveResult<StatusResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: AtomicU32::new(0),
            }
        }

        async fn next(&self) -> SieveResult<StatusResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop().unwrap()
            } else {
                match responses.last().unwrap() {
                    Ok(r) => Ok(r.clone()),
                    Err(e) => Err(SieveError::invalid_response(e.to_string())),
                }
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Recorder {
        labels: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PollObserver for Recorder {
        async fn on_progress(&self, progress: &PollProgress) {
            self.labels
                .lock()
                .unwrap()
                .push(progress.status_label().to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_on_first_call() {
        let script = Script::new(vec![ok(json!({
            "status": "finished",
            "outputs": [{"type": "sieve.File", "data": {"url": URL}}]
        }))]);

        let outcome = poller(10)
            .poll(&JobId::from("j"), || script.next(), &NoopObserver)
            .await;

        assert_eq!(outcome.asset_url(), Some(URL));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_time_out_with_doubled_delay() {
        let script = Script::new(vec![Ok(StatusResponse::new(503, "busy"))]);
        let started = tokio::time::Instant::now();

        let outcome = poller(4)
            .poll(&JobId::from("job-503"), || script.next(), &NoopObserver)
            .await;

        assert_eq!(script.calls(), 4);
        match outcome {
            PollOutcome::TimedOut {
                job_id,
                last_raw_response,
            } => {
                assert_eq!(job_id, JobId::from("job-503"));
                assert!(last_raw_response.is_none());
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // Three sleeps of 2 x 100ms; none after the last attempt.
        assert_eq!(started.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_url_gives_up_on_fifth() {
        let script = Script::new(vec![ok(json!({"status": "completed", "outputs": []}))]);
        let started = tokio::time::Instant::now();

        let outcome = poller(120)
            .poll(&JobId::from("j"), || script.next(), &NoopObserver)
            .await;

        assert_eq!(script.calls(), 5);
        assert!(matches!(outcome, PollOutcome::Failed { .. }));
        // Four accelerated sleeps of 0.5 x 100ms.
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_status_resets_completed_streak() {
        let mut responses = Vec::new();
        for _ in 0..4 {
            responses.push(ok(json!({"status": "completed"})));
        }
        responses.push(ok(json!({"status": "running"})));
        for _ in 0..4 {
            responses.push(ok(json!({"status": "completed"})));
        }
        responses.push(ok(json!({"status": "finished", "outputs": {"output_0": {"url": URL}}})));
        let script = Script::new(responses);

        let outcome = poller(120)
            .poll(&JobId::from("j"), || script.next(), &NoopObserver)
            .await;

        assert_eq!(outcome.asset_url(), Some(URL));
        assert_eq!(script.calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_carries_backend_message() {
        let script = Script::new(vec![ok(json!({
            "status": "error",
            "error": {"message": "video unavailable"}
        }))]);

        let outcome = poller(10)
            .poll(&JobId::from("j"), || script.next(), &NoopObserver)
            .await;

        assert_eq!(outcome, PollOutcome::failed("video unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_then_success() {
        let script = Script::new(vec![
            Err(SieveError::invalid_response("connection reset")),
            Ok(StatusResponse::new(502, "bad gateway")),
            Ok(StatusResponse::new(200, "<html>not json</html>")),
            ok(json!({"status": "queued"})),
            ok(json!({"status": "processing", "progress": 40})),
            ok(json!({"status": "finished", "url": URL})),
        ]);
        let recorder = Recorder::default();
        let started = tokio::time::Instant::now();

        let outcome = poller(10)
            .poll(&JobId::from("j"), || script.next(), &recorder)
            .await;

        assert_eq!(outcome.asset_url(), Some(URL));
        assert_eq!(script.calls(), 6);
        assert_eq!(*recorder.labels.lock().unwrap(), vec!["queued", "running"]);
        // 100 (network) + 200 (5xx) + 100 (not json) + 150 (queued) + 100 (running)
        assert_eq!(started.elapsed(), Duration::from_millis(650));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_last_raw_response() {
        let script = Script::new(vec![ok(json!({"status": "running"}))]);

        let outcome = poller(3)
            .poll(&JobId::from("j"), || script.next(), &NoopObserver)
            .await;

        match outcome {
            PollOutcome::TimedOut {
                last_raw_response, ..
            } => assert_eq!(last_raw_response.as_deref(), Some(r#"{"status":"running"}"#)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_backoff_delays() {
        let base = Duration::from_millis(5000);
        assert_eq!(Backoff::Accelerated.delay(base), Duration::from_millis(2500));
        assert_eq!(Backoff::Normal.delay(base), base);
        assert_eq!(Backoff::Queued.delay(base), Duration::from_millis(7500));
        assert_eq!(Backoff::ServerError.delay(base), Duration::from_millis(10000));
    }

    #[test]
    fn test_failure_reason_fallbacks() {
        assert_eq!(failure_reason(&json!({"error": "boom"})), "boom");
        assert_eq!(failure_reason(&json!({"error": {"message": "nested"}})), "nested");
        assert_eq!(failure_reason(&json!({"status": "failed"})), "Unknown error");
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(&json!({"progress": 0.25})), Some(0.25));
        assert_eq!(progress_fraction(&json!({"progress": 40})), Some(0.4));
        assert_eq!(progress_fraction(&json!({})), None);
    }
}
