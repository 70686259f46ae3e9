//! Job backend abstraction.

use async_trait::async_trait;
use std::fmt;

use vshort_models::{JobId, SourceId, StatusResponse};

use crate::error::SieveResult;

/// API credentials for the job backend.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SieveCredentials {
    api_key: String,
}

impl SieveCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for SieveCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SieveCredentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Acknowledgement of an accepted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub id: JobId,
}

/// Asynchronous video-processing backend.
///
/// `fetch_status` reports every HTTP response, including non-2xx ones, as
/// `Ok`; only transport failures are errors. The poller decides how to back
/// off from the status code.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit a segment extraction job for `[start_time, end_time]` seconds.
    async fn submit(
        &self,
        source: &SourceId,
        start_time: f64,
        end_time: f64,
        credentials: &SieveCredentials,
    ) -> SieveResult<SubmittedJob>;

    /// Fetch the raw status of a job.
    async fn fetch_status(
        &self,
        job_id: &JobId,
        credentials: &SieveCredentials,
    ) -> SieveResult<StatusResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = SieveCredentials::new("secret-key");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_blank_credentials_are_empty() {
        assert!(SieveCredentials::new("  ").is_empty());
        assert!(SieveCredentials::default().is_empty());
        assert!(!SieveCredentials::new("k").is_empty());
    }
}
