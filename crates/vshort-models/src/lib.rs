//! Shared data models for the viral short orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Backend jobs and their handles
//! - Poll outcomes and the backend status vocabulary
//! - Scored segment candidates
//! - The published short result record
//! - Transcripts and source video identifiers

pub mod job;
pub mod job_status;
pub mod outcome;
pub mod segment;
pub mod short_result;
pub mod source;
pub mod transcript;

// Re-export common types
pub use job::{JobHandle, JobId, TimeRange};
pub use job_status::{BackendJobStatus, StatusResponse};
pub use outcome::{PollOutcome, PollProgress};
pub use segment::{fallback_candidates, rank_candidates, SegmentCandidate};
pub use short_result::{ShortResult, ShortStatus};
pub use source::{SourceId, SourceIdError};
pub use transcript::{format_timestamp, Transcript, TranscriptSegment};
