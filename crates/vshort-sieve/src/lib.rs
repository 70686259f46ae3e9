//! Sieve job backend integration.
//!
//! This crate provides:
//! - The `JobBackend` trait and its HTTP implementation, `SieveClient`
//! - Asset URL extraction from inconsistent status payloads
//! - `JobPoller`, which drives a job to a terminal outcome with adaptive backoff
//! - `SegmentJobClient`, which submits a clip request and polls it to completion

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod poller;
pub mod retry;
pub mod segment;

pub use backend::{JobBackend, SieveCredentials, SubmittedJob};
pub use client::SieveClient;
pub use config::SieveConfig;
pub use error::{SieveError, SieveResult};
pub use extract::OutputsShape;
pub use poller::{JobPoller, NoopObserver, PollObserver, PollerConfig};
pub use retry::{retry_async, FailureTracker, RetryConfig, RetryResult};
pub use segment::{RefreshOutcome, SegmentExtraction, SegmentFailure, SegmentJobClient};
