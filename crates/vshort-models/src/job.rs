//! Backend job identifiers and handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the video-processing backend to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Requested clip range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Start offset in seconds
    pub start_time: f64,
    /// Clip length in seconds
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start_time: f64, duration: f64) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// End offset in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Handle for a job accepted by the backend.
///
/// Created once per successful submission and never mutated; it lives for
/// one polling cycle of the segment client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_id: JobId,
    pub submitted_at: DateTime<Utc>,
    pub requested_range: TimeRange,
    pub source_id: String,
}

impl JobHandle {
    pub fn new(job_id: JobId, source_id: impl Into<String>, requested_range: TimeRange) -> Self {
        Self {
            job_id,
            submitted_at: Utc::now(),
            requested_range,
            source_id: source_id.into(),
        }
    }
}
