//! Viral short worker.
//!
//! This crate provides:
//! - The short creation workflow and job force-refresh
//! - Transcript and segment scoring adapters
//! - Structured job logging

pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod scorer;
pub mod transcript;

pub use collaborators::{SegmentScorer, TranscriptProvider};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::{OrchestratorConfig, ShortRequest, ViralSegmentOrchestrator};
pub use scorer::{OpenRouterConfig, OpenRouterScorer};
pub use transcript::SieveTranscriptProvider;
