//! Backend job status vocabulary.
//!
//! The video-processing backend has used several labels for the same state
//! across API versions. This module folds them into one tagged type so the
//! poller can match on states instead of strings.

use serde::{Deserialize, Serialize};

/// Job status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendJobStatus {
    /// Waiting for a backend worker
    Queued,
    /// Being processed
    Running,
    /// Finished; outputs may or may not be attached yet
    Completed,
    /// Finished with an error
    Failed,
    /// Any label we do not recognize
    Unknown(String),
}

impl BackendJobStatus {
    /// Parse a backend status label (case-insensitive).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => BackendJobStatus::Queued,
            "running" | "processing" | "started" => BackendJobStatus::Running,
            "completed" | "finished" => BackendJobStatus::Completed,
            "failed" | "error" => BackendJobStatus::Failed,
            other => BackendJobStatus::Unknown(other.to_string()),
        }
    }

    /// Read the status from a parsed status payload (`status` field).
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        payload
            .get("status")
            .and_then(|s| s.as_str())
            .map(Self::from_label)
            .unwrap_or_else(|| BackendJobStatus::Unknown(String::new()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            BackendJobStatus::Queued => "queued",
            BackendJobStatus::Running => "running",
            BackendJobStatus::Completed => "completed",
            BackendJobStatus::Failed => "failed",
            BackendJobStatus::Unknown(label) if label.is_empty() => "unknown",
            BackendJobStatus::Unknown(label) => label,
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, BackendJobStatus::Completed | BackendJobStatus::Failed)
    }
}

impl std::fmt::Display for BackendJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw status fetch: HTTP status code plus the unparsed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub http_status: u16,
    pub body_text: String,
}

impl StatusResponse {
    pub fn new(http_status: u16, body_text: impl Into<String>) -> Self {
        Self {
            http_status,
            body_text: body_text.into(),
        }
    }

    /// 2xx response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }

    /// 5xx response.
    pub fn is_server_error(&self) -> bool {
        self.http_status >= 500
    }
}
