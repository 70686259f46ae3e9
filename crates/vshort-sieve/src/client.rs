//! Sieve HTTP client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vshort_models::{JobId, SourceId, StatusResponse, Transcript, TranscriptSegment};

use crate::backend::{JobBackend, SieveCredentials, SubmittedJob};
use crate::config::SieveConfig;
use crate::error::{SieveError, SieveResult};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    function: &'a str,
    inputs: DownloaderInputs,
}

#[derive(Debug, Serialize)]
struct DownloaderInputs {
    url: String,
    download_type: &'static str,
    resolution: &'static str,
    include_audio: bool,
    start_time: f64,
    end_time: f64,
    include_metadata: bool,
    video_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest {
    video_url: String,
    include_timestamps: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
    #[serde(default)]
    language: Option<String>,
}

/// HTTP client for the Sieve job API.
pub struct SieveClient {
    http: Client,
    config: SieveConfig,
}

impl SieveClient {
    /// Create a new Sieve client.
    pub fn new(config: SieveConfig) -> SieveResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SieveError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> SieveResult<Self> {
        Self::new(SieveConfig::from_env())
    }

    pub fn config(&self) -> &SieveConfig {
        &self.config
    }

    /// Fetch the timed transcript of a source video.
    pub async fn fetch_transcript(
        &self,
        source: &SourceId,
        credentials: &SieveCredentials,
    ) -> SieveResult<Transcript> {
        if credentials.is_empty() {
            return Err(SieveError::invalid_request("Sieve API key is required"));
        }

        let url = format!("{}/v1/youtube_downloader/transcript", self.config.base_url);
        debug!(source = %source, "Requesting transcript");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, credentials.api_key())
            .json(&TranscriptRequest {
                video_url: source.watch_url(),
                include_timestamps: true,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: TranscriptResponse = serde_json::from_str(&body)?;
        let language = parsed.language.unwrap_or_else(|| "en".to_string());

        if !parsed.segments.is_empty() {
            return Ok(Transcript::from_segments(parsed.segments, language));
        }

        match parsed.transcript.filter(|t| !t.trim().is_empty()) {
            Some(text) => {
                let mut transcript = Transcript::from_text(text);
                transcript.language = language;
                Ok(transcript)
            }
            None => Err(SieveError::invalid_response("No transcript found in response")),
        }
    }
}

#[async_trait]
impl JobBackend for SieveClient {
    async fn submit(
        &self,
        source: &SourceId,
        start_time: f64,
        end_time: f64,
        credentials: &SieveCredentials,
    ) -> SieveResult<SubmittedJob> {
        let url = format!("{}/v2/push", self.config.base_url);
        let request = PushRequest {
            function: &self.config.downloader_function,
            inputs: DownloaderInputs {
                url: source.watch_url(),
                download_type: "video",
                resolution: "highest-available",
                include_audio: true,
                start_time,
                end_time,
                include_metadata: true,
                video_format: "mp4",
            },
        };

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, credentials.api_key())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Sieve rejected job submission");
            return Err(api_error(status, &body));
        }

        let parsed: PushResponse = serde_json::from_str(&body)?;
        let id = parsed
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SieveError::invalid_response("Submission response has no job id"))?;

        info!(job_id = %id, source = %source, start_time, end_time, "Submitted Sieve job");
        Ok(SubmittedJob {
            id: JobId::from_string(id),
        })
    }

    async fn fetch_status(
        &self,
        job_id: &JobId,
        credentials: &SieveCredentials,
    ) -> SieveResult<StatusResponse> {
        let url = format!("{}/v2/jobs/{}", self.config.base_url, job_id);

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, credentials.api_key())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(StatusResponse::new(status, body))
    }
}

/// Build an API error from a non-2xx response, preferring the body's
/// `message` or `error` field over the status text.
fn api_error(status: StatusCode, body: &str) -> SieveError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .or_else(|| v.get("error").and_then(|e| e.as_str()))
                .or_else(|| {
                    v.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                })
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    SieveError::api(status.as_u16(), message)
}
