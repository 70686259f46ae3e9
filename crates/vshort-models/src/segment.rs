//! Scored segment candidates.

use serde::{Deserialize, Serialize};

/// Length of each fallback candidate in seconds.
const FALLBACK_DURATION: f64 = 15.0;

/// A time range proposed by the scorer as a potential viral short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCandidate {
    /// Start offset in seconds
    pub start_time: f64,
    /// End offset in seconds
    pub end_time: f64,
    /// Virality score (0-100)
    pub virality_score: f64,
    /// Why this segment should perform well
    #[serde(default)]
    pub explanation: String,
    /// Transcript text covered by the segment
    #[serde(default)]
    pub transcript_text: String,
}

impl SegmentCandidate {
    pub fn new(start_time: f64, end_time: f64, virality_score: f64) -> Self {
        Self {
            start_time,
            end_time,
            virality_score: virality_score.clamp(0.0, 100.0),
            explanation: String::new(),
            transcript_text: String::new(),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_transcript_text(mut self, text: impl Into<String>) -> Self {
        self.transcript_text = text.into();
        self
    }

    /// Segment length in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Sort candidates by virality score, highest first.
///
/// The sort is stable, so equal scores keep the scorer's order.
pub fn rank_candidates(mut candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate> {
    candidates.sort_by(|a, b| b.virality_score.total_cmp(&a.virality_score));
    candidates
}

/// Fixed candidates used when the scorer returns nothing.
///
/// Offsets sit where videos commonly place their hook, a key point and the
/// wrap-up.
pub fn fallback_candidates() -> Vec<SegmentCandidate> {
    vec![
        SegmentCandidate::new(30.0, 30.0 + FALLBACK_DURATION, 85.0)
            .with_explanation("This segment likely contains key information or an engaging hook")
            .with_transcript_text("Fallback segment near the opening hook."),
        SegmentCandidate::new(60.0, 60.0 + FALLBACK_DURATION, 75.0)
            .with_explanation("This segment likely contains valuable content or an interesting point")
            .with_transcript_text("Fallback segment near the first key point."),
        SegmentCandidate::new(120.0, 120.0 + FALLBACK_DURATION, 65.0)
            .with_explanation("This segment likely contains a conclusion or call to action")
            .with_transcript_text("Fallback segment near the wrap-up."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_by_score_desc() {
        let ranked = rank_candidates(vec![
            SegmentCandidate::new(10.0, 25.0, 80.0),
            SegmentCandidate::new(40.0, 55.0, 90.0),
            SegmentCandidate::new(70.0, 85.0, 85.0),
        ]);
        let scores: Vec<f64> = ranked.iter().map(|c| c.virality_score).collect();
        assert_eq!(scores, vec![90.0, 85.0, 80.0]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let ranked = rank_candidates(vec![
            SegmentCandidate::new(1.0, 2.0, 50.0).with_explanation("first"),
            SegmentCandidate::new(3.0, 4.0, 50.0).with_explanation("second"),
        ]);
        assert_eq!(ranked[0].explanation, "first");
    }

    #[test]
    fn test_fallback_offsets() {
        let fallback = fallback_candidates();
        let starts: Vec<f64> = fallback.iter().map(|c| c.start_time).collect();
        assert_eq!(starts, vec![30.0, 60.0, 120.0]);
        assert!(fallback.iter().all(|c| c.duration() == 15.0));
        assert_eq!(rank_candidates(fallback.clone()), fallback);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(SegmentCandidate::new(0.0, 1.0, 140.0).virality_score, 100.0);
        assert_eq!(SegmentCandidate::new(0.0, 1.0, -3.0).virality_score, 0.0);
    }
}
