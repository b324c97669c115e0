//! Generative synthesis client.
//!
//! The generative model is an opaque black box: rendered prompt text in,
//! free text out. This crate owns the call plumbing — a retried, paced,
//! non-streaming HTTP client — plus the extraction of code blocks and JSON
//! objects from the returned text. What the model says is someone else's
//! concern; that the call is slow, flaky, and rate-limited is ours.

mod extract;
mod gemini;
pub mod pacing;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use extract::{extract_code_block, extract_json_object};
pub use gemini::GeminiClient;
pub use pacing::Pacer;
pub use retry::RetryConfig;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_MIN_CALL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis API error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("synthesis request failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },
    #[error("synthesis response contained no text")]
    EmptyResponse,
    #[error("failed to build HTTP client: {message}")]
    ClientBuild { message: String },
    #[error("API key not set (expected in ${env})")]
    MissingApiKey { env: String },
}

/// Explicit configuration for the synthesis call site, scoped to one
/// pipeline run. No global or module-level API state exists.
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub min_call_interval: Duration,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl SynthesisConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            min_call_interval: DEFAULT_MIN_CALL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    /// Read the API key from the named environment variable.
    pub fn from_env(env: &str, model: impl Into<String>) -> Result<Self, SynthesisError> {
        let api_key = std::env::var(env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SynthesisError::MissingApiKey {
                env: env.to_string(),
            })?;
        Ok(Self::new(api_key, model))
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_min_call_interval(mut self, interval: Duration) -> Self {
        self.min_call_interval = interval;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

pub type SynthesisFut<'a> = Pin<Box<dyn Future<Output = Result<String, SynthesisError>> + Send + 'a>>;

/// The black-box generative call: rendered prompt in, free text out.
pub trait SynthesisClient: Send + Sync {
    fn synthesize<'a>(&'a self, prompt: &'a str) -> SynthesisFut<'a>;
}

#[cfg(test)]
mod tests {
    use super::{SynthesisConfig, SynthesisError};

    #[test]
    fn from_env_fails_without_the_variable() {
        let err = SynthesisConfig::from_env("GRIDSMITH_TEST_ABSENT_KEY", "m").unwrap_err();
        assert!(matches!(err, SynthesisError::MissingApiKey { env } if env == "GRIDSMITH_TEST_ABSENT_KEY"));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = SynthesisConfig::new("k", "m")
            .with_base_url("http://localhost:1234/")
            .with_min_call_interval(std::time::Duration::ZERO);
        assert_eq!(config.base_url, "http://localhost:1234/");
        assert_eq!(config.min_call_interval, std::time::Duration::ZERO);
        assert_eq!(config.model, "m");
    }
}
