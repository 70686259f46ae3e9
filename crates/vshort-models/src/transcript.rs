//! Video transcripts.

use serde::{Deserialize, Serialize};

/// One timed line of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Render as `[m:ss - m:ss] text`.
    pub fn to_line(&self) -> String {
        format!(
            "[{} - {}] {}",
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text.trim()
        )
    }
}

/// Transcript of a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Full text handed to the scorer
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Video length in seconds, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Transcript {
    /// Build a transcript from plain text without timing.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            segments: Vec::new(),
            language: default_language(),
            duration: None,
        }
    }

    /// Build a transcript from timed segments.
    ///
    /// The text is one `[m:ss - m:ss] text` line per segment so the scorer can
    /// cite offsets; the duration is the end of the last segment.
    pub fn from_segments(segments: Vec<TranscriptSegment>, language: impl Into<String>) -> Self {
        let text = segments
            .iter()
            .map(TranscriptSegment::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        let duration = segments.iter().map(|s| s.end).reduce(f64::max);
        Self {
            text,
            segments,
            language: language.into(),
            duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Format seconds as `m:ss`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(5.9), "0:05");
        assert_eq!(format_timestamp(75.0), "1:15");
        assert_eq!(format_timestamp(3600.0), "60:00");
        assert_eq!(format_timestamp(-2.0), "0:00");
    }

    #[test]
    fn test_from_segments_renders_lines() {
        let transcript = Transcript::from_segments(
            vec![
                TranscriptSegment::new(0.0, 4.5, "Hello there"),
                TranscriptSegment::new(62.0, 70.0, " and welcome back "),
            ],
            "en",
        );
        assert_eq!(
            transcript.text,
            "[0:00 - 0:04] Hello there\n[1:02 - 1:10] and welcome back"
        );
        assert_eq!(transcript.duration, Some(70.0));
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_deserialize_defaults() {
        let transcript: Transcript = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(transcript.language, "en");
        assert!(transcript.segments.is_empty());
        assert!(Transcript::from_text("   ").is_empty());
    }
}
