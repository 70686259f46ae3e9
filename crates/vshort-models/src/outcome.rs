//! Poll outcomes.

use serde::{Deserialize, Serialize};

use crate::JobId;

/// Result of driving a backend job through the poller.
///
/// `Completed`, `Failed` and `TimedOut` are terminal. `InProgress` is only
/// ever reported to poll observers between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The backend produced a downloadable asset.
    Completed {
        asset_url: String,
        raw_status: serde_json::Value,
    },
    /// The backend reported failure, or completed without any usable asset.
    Failed { reason: String },
    /// Polling ran out of attempts before a terminal state.
    TimedOut {
        job_id: JobId,
        last_raw_response: Option<String>,
    },
    /// Still running.
    InProgress {
        status_label: String,
        progress_fraction: Option<f64>,
    },
}

impl PollOutcome {
    /// Build a `Completed` outcome; `None` when the URL is blank.
    pub fn completed(asset_url: impl Into<String>, raw_status: serde_json::Value) -> Option<Self> {
        let asset_url = asset_url.into();
        if asset_url.trim().is_empty() {
            return None;
        }
        Some(PollOutcome::Completed {
            asset_url,
            raw_status,
        })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PollOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::InProgress { .. })
    }

    pub fn asset_url(&self) -> Option<&str> {
        match self {
            PollOutcome::Completed { asset_url, .. } => Some(asset_url),
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PollOutcome::Completed { .. } => "completed",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::InProgress { .. } => "in_progress",
        }
    }
}

/// Progress report emitted once per non-terminal poll attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollProgress {
    /// 1-indexed attempt number
    pub attempt: u32,
    pub max_attempts: u32,
    /// Always `PollOutcome::InProgress`
    pub outcome: PollOutcome,
}

impl PollProgress {
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        status_label: impl Into<String>,
        progress_fraction: Option<f64>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            outcome: PollOutcome::InProgress {
                status_label: status_label.into(),
                progress_fraction,
            },
        }
    }

    pub fn status_label(&self) -> &str {
        match &self.outcome {
            PollOutcome::InProgress { status_label, .. } => status_label,
            _ => "",
        }
    }

    pub fn progress_fraction(&self) -> Option<f64> {
        match &self.outcome {
            PollOutcome::InProgress {
                progress_fraction, ..
            } => *progress_fraction,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completed_requires_url() {
        assert!(PollOutcome::completed("", json!({})).is_none());
        assert!(PollOutcome::completed("   ", json!({})).is_none());

        let outcome = PollOutcome::completed("https://cdn.example/clip.mp4", json!({})).unwrap();
        assert_eq!(outcome.asset_url(), Some("https://cdn.example/clip.mp4"));
        assert!(outcome.is_terminal());
    }

    #[test]
    fn test_in_progress_is_not_terminal() {
        let progress = PollProgress::new(3, 120, "running", Some(0.4));
        assert!(!progress.outcome.is_terminal());
        assert_eq!(progress.status_label(), "running");
        assert_eq!(progress.progress_fraction(), Some(0.4));
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let outcome = PollOutcome::TimedOut {
            job_id: JobId::from("job-9"),
            last_raw_response: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "timed_out");
        assert_eq!(json["job_id"], "job-9");
    }
}
