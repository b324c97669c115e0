//! Gemini GenerateContent client.
//!
//! Non-streaming: the pipeline consumes whole responses (a code block or a
//! JSON trace), so there is nothing to surface incrementally.

use serde::{Deserialize, Serialize};

use crate::retry::send_with_retry;
use crate::{SynthesisClient, SynthesisConfig, SynthesisError, SynthesisFut, pacing::Pacer};

const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Synthesis client for the Gemini GenerateContent API.
///
/// Holds its own paced, retried HTTP client; configuration lives for one
/// pipeline run and is passed in explicitly.
pub struct GeminiClient {
    config: SynthesisConfig,
    client: reqwest::Client,
    pacer: Pacer,
}

impl GeminiClient {
    pub fn new(config: SynthesisConfig) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SynthesisError::ClientBuild {
                message: e.to_string(),
            })?;
        let pacer = Pacer::new(config.min_call_interval);
        Ok(Self {
            config,
            client,
            pacer,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, SynthesisError> {
        // Every call is possibly slow and rate-limited; space them out and
        // await them sequentially.
        self.pacer.pause().await;

        let url = self.endpoint();
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let body = serde_json::to_value(&body).map_err(|e| SynthesisError::ClientBuild {
            message: e.to_string(),
        })?;

        tracing::debug!(model = %self.config.model, prompt_bytes = prompt.len(), "synthesis call");
        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.config.api_key)
                    .json(&body)
            },
            &self.config.retry,
        )
        .await?;

        let payload: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| SynthesisError::Transport {
                    attempts: 1,
                    message: format!("failed to read response body: {e}"),
                })?;

        let text: String = payload
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        Ok(text)
    }
}

impl SynthesisClient for GeminiClient {
    fn synthesize<'a>(&'a self, prompt: &'a str) -> SynthesisFut<'a> {
        Box::pin(self.generate(prompt))
    }
}
