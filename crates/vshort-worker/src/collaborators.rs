//! Collaborator seams of the orchestrator.

use async_trait::async_trait;

use vshort_models::{SegmentCandidate, SourceId, Transcript};

use crate::error::WorkerResult;

/// Fetches the transcript of a source video.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, source: &SourceId) -> WorkerResult<Transcript>;
}

/// Proposes scored candidate segments from a transcript.
#[async_trait]
pub trait SegmentScorer: Send + Sync {
    /// Candidates for `target_duration`-second shorts in the given style.
    ///
    /// An empty list is a valid answer; the orchestrator falls back to fixed
    /// offsets.
    async fn score(
        &self,
        transcript: &Transcript,
        target_duration: f64,
        style: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>>;
}
