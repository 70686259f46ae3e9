//! Transcript provider backed by the Sieve transcript endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use vshort_models::{SourceId, Transcript};
use vshort_sieve::{SieveClient, SieveCredentials};

use crate::collaborators::TranscriptProvider;
use crate::error::{WorkerError, WorkerResult};

/// Fetches timed transcripts through the Sieve API.
pub struct SieveTranscriptProvider {
    client: Arc<SieveClient>,
    credentials: SieveCredentials,
}

impl SieveTranscriptProvider {
    pub fn new(client: Arc<SieveClient>, credentials: SieveCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl TranscriptProvider for SieveTranscriptProvider {
    async fn fetch(&self, source: &SourceId) -> WorkerResult<Transcript> {
        let transcript = self
            .client
            .fetch_transcript(source, &self.credentials)
            .await
            .map_err(|e| WorkerError::transcript_failed(e.to_string()))?;

        if transcript.is_empty() {
            return Err(WorkerError::transcript_failed(format!(
                "Transcript for {} is empty",
                source
            )));
        }

        info!(
            source = %source,
            segments = transcript.segments.len(),
            language = %transcript.language,
            "Fetched transcript"
        );
        Ok(transcript)
    }
}
