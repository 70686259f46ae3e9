//! Source video identifiers.
//!
//! Requests may name the source video either by its bare 11-character id or
//! by any of the common YouTube URL forms. Both are normalized into `SourceId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

/// Errors that can occur while parsing a source video id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceIdError {
    #[error("source id is empty")]
    Empty,

    #[error("URL is not a valid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("video id not found in URL")]
    NotFound,

    #[error("video id has invalid format: {0}")]
    InvalidFormat(String),
}

/// Identifier of the source video in the processing backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Parse a bare id or a YouTube URL.
    ///
    /// Supported URL forms:
    /// - https://youtube.com/watch?v=VIDEO_ID
    /// - https://youtu.be/VIDEO_ID
    /// - https://youtube.com/embed/VIDEO_ID
    /// - https://youtube.com/v/VIDEO_ID
    /// - https://youtube.com/shorts/VIDEO_ID
    pub fn parse(input: &str) -> Result<Self, SourceIdError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SourceIdError::Empty);
        }

        if !input.contains('/') && !input.contains('.') {
            return validate(input);
        }

        let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };
        let url = Url::parse(&with_scheme).map_err(|_| SourceIdError::InvalidUrl(input.into()))?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

        if host == "youtu.be" || host.ends_with(".youtu.be") {
            let id = url
                .path_segments()
                .and_then(|mut segments| segments.next())
                .filter(|s| !s.is_empty())
                .ok_or(SourceIdError::NotFound)?;
            return validate(id);
        }

        if host != "youtube.com" && !host.ends_with(".youtube.com") {
            return Err(SourceIdError::InvalidUrl(input.into()));
        }

        if let Some((_, v)) = url.query_pairs().find(|(key, _)| key == "v") {
            return validate(&v);
        }

        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        match segments.as_slice() {
            ["embed" | "v" | "shorts" | "live", id, ..] if !id.is_empty() => validate(id),
            _ => Err(SourceIdError::NotFound),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL submitted to the backend.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

fn validate(id: &str) -> Result<SourceId, SourceIdError> {
    let valid = id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(SourceId(id.to_string()))
    } else {
        Err(SourceIdError::InvalidFormat(id.to_string()))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SourceId {
    type Err = SourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SourceId {
    type Error = SourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}
