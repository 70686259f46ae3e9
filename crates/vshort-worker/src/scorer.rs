//! OpenRouter client for viral segment scoring.
//!
//! Sends the transcript to a chat-completion model and parses the scored
//! segments out of its reply. Models are tried in order until one answers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use vshort_models::{rank_candidates, SegmentCandidate, Transcript};

use crate::collaborators::SegmentScorer;
use crate::error::{WorkerError, WorkerResult};

const DEFAULT_MODELS: &[&str] = &[
    "meta-llama/llama-3-8b-instruct",
    "mistralai/mistral-7b-instruct",
];

/// Configuration for the OpenRouter scorer.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    /// Base URL of the API (no trailing slash)
    pub base_url: String,
    /// Models tried in order
    pub models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Sent as `X-Title`
    pub app_title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: 0.2,
            max_tokens: 1000,
            timeout: Duration::from_secs(60),
            app_title: "ViralShorts".to_string(),
        }
    }
}

impl OpenRouterConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            models: std::env::var("OPENROUTER_MODELS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|models| !models.is_empty())
                .unwrap_or(defaults.models),
            timeout: Duration::from_secs(
                std::env::var("OPENROUTER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Scores transcript segments with an OpenRouter chat model.
pub struct OpenRouterScorer {
    http: Client,
    config: OpenRouterConfig,
}

impl OpenRouterScorer {
    pub fn new(config: OpenRouterConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::config_error(format!("HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::new(OpenRouterConfig::from_env())
    }

    /// Call one model and return the raw message content.
    async fn complete(&self, api_key: &str, model: &str, prompt: &str) -> WorkerResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Title", &self.config.app_title)
            .json(&request)
            .send()
            .await
            .map_err(|e| WorkerError::ai_failed(format!("OpenRouter request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorkerError::ai_failed(format!(
                "OpenRouter returned {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            WorkerError::ai_failed(format!("Failed to parse OpenRouter response: {}", e))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| WorkerError::ai_failed("No content in OpenRouter response"))
    }
}

#[async_trait]
impl SegmentScorer for OpenRouterScorer {
    async fn score(
        &self,
        transcript: &Transcript,
        target_duration: f64,
        style: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| WorkerError::config_error("OPENROUTER_API_KEY not set"))?;
        let prompt = build_prompt(&transcript.text, target_duration, style);

        let mut last_error = None;
        for model in &self.config.models {
            info!("Attempting OpenRouter with model: {}", model);
            match self.complete(api_key, model, &prompt).await {
                Ok(content) => {
                    let candidates = parse_candidates(&content, target_duration);
                    info!(
                        model = %model,
                        candidates = candidates.len(),
                        "Scored transcript segments"
                    );
                    return Ok(candidates);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WorkerError::ai_failed("No OpenRouter models configured")))
    }
}

/// Build the scoring prompt.
fn build_prompt(transcript: &str, target_duration: f64, style: &str) -> String {
    format!(
        r#"You are an expert at identifying viral-worthy content in videos.

Analyze this YouTube video transcript and identify the most engaging {target_duration}-second segments that would make great viral shorts.

The viral style I'm looking for is: {style}

For each segment, I need:
1. Precise start and end timestamps (in seconds)
2. A virality score (0-100)
3. A brief explanation of why this segment would be viral
4. The exact transcript text for this segment

Viral criteria to consider:
- Emotional moments (surprising revelations, emotional stories)
- Controversial or thought-provoking statements
- Useful tips that provide immediate value
- Humorous or entertaining content
- Relatable experiences or observations
- Educational content that teaches something quickly

Identify the top 3 most viral segments in this transcript.

Transcript:
{transcript}

Respond with a JSON object containing an array of segments with the following structure:
{{
  "segments": [
    {{
      "startTime": number,
      "endTime": number,
      "viralityScore": number,
      "explanation": "string",
      "transcriptText": "string"
    }}
  ]
}}

Only return the JSON object and nothing else."#
    )
}

/// Parse scored segments out of model output.
///
/// Takes everything from the first `{` to the last `}` so code fences and
/// chatter around the JSON are ignored. End times are normalized to
/// `start + target_duration`. Unusable output yields an empty list.
pub fn parse_candidates(content: &str, target_duration: f64) -> Vec<SegmentCandidate> {
    let json = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            debug!("Model output contains no JSON object");
            return Vec::new();
        }
    };

    let parsed: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Model output is not valid JSON");
            return Vec::new();
        }
    };

    let Some(segments) = parsed.get("segments").and_then(Value::as_array) else {
        return Vec::new();
    };

    let candidates = segments
        .iter()
        .map(|segment| {
            let start = number(segment.get("startTime")).unwrap_or(0.0).max(0.0);
            let score = number(segment.get("viralityScore")).unwrap_or(0.0);
            SegmentCandidate::new(start, start + target_duration, score)
                .with_explanation(
                    text(segment.get("explanation"))
                        .unwrap_or_else(|| "Viral-worthy content".to_string()),
                )
                .with_transcript_text(text(segment.get("transcriptText")).unwrap_or_default())
        })
        .collect();

    rank_candidates(candidates)
}

/// A number, or a string that parses as one.
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
