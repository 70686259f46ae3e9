//! The published short result record.
//!
//! One `ShortResult` exists per in-flight request. The orchestrator mutates it
//! as the workflow advances and publishes the whole record after every change,
//! so the latest write always describes the complete state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, SegmentCandidate};

/// Workflow status as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortStatus {
    #[default]
    Processing,
    Completed,
    Error,
    Timeout,
}

impl ShortStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortStatus::Processing => "processing",
            ShortStatus::Completed => "completed",
            ShortStatus::Error => "error",
            ShortStatus::Timeout => "timeout",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ShortStatus::Processing)
    }
}

impl std::fmt::Display for ShortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally published status of one short-creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortResult {
    pub status: ShortStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ShortResult {
    /// Start a new record in the processing state.
    pub fn processing(video_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ShortStatus::Processing,
            success: false,
            message: Some(message.into()),
            video_id: Some(video_id.into()),
            short_url: None,
            start_time: None,
            duration: None,
            virality_score: None,
            explanation: None,
            transcript_text: None,
            job_id: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Start a record for an existing backend job whose request is unknown.
    pub fn for_job(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            video_id: None,
            job_id: Some(job_id),
            ..Self::processing(String::new(), message)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move back to processing with a new progress message.
    pub fn set_processing(&mut self, message: impl Into<String>) {
        self.status = ShortStatus::Processing;
        self.success = false;
        self.message = Some(message.into());
        self.error = None;
        self.touch();
    }

    /// Attach the candidate currently being extracted.
    pub fn set_candidate(&mut self, candidate: &SegmentCandidate) {
        self.start_time = Some(candidate.start_time);
        self.duration = Some(candidate.duration());
        self.virality_score = Some(candidate.virality_score);
        self.explanation = Some(candidate.explanation.clone());
        self.transcript_text = Some(candidate.transcript_text.clone());
        self.touch();
    }

    pub fn set_job_id(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.touch();
    }

    /// Mark as completed with the downloadable short URL.
    pub fn complete(&mut self, short_url: impl Into<String>, job_id: Option<JobId>) {
        self.status = ShortStatus::Completed;
        self.success = true;
        self.short_url = Some(short_url.into());
        self.message = Some("Your short is ready".into());
        self.error = None;
        if job_id.is_some() {
            self.job_id = job_id;
        }
        self.touch();
    }

    /// Mark as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ShortStatus::Error;
        self.success = false;
        self.short_url = None;
        self.error = Some(error.into());
        self.touch();
    }

    /// Mark as timed out; the job id is kept so the caller can check again later.
    pub fn time_out(&mut self, job_id: Option<JobId>, error: impl Into<String>) {
        self.status = ShortStatus::Timeout;
        self.success = false;
        self.short_url = None;
        self.error = Some(error.into());
        self.message =
            Some("The video is still processing. Please check back in a few minutes.".into());
        if job_id.is_some() {
            self.job_id = job_id;
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.timestamp = Utc::now();
    }
}
