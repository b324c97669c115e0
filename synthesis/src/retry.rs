//! HTTP retry policy with exponential backoff.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

use crate::SynthesisError;

/// Retry configuration for synthesis calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum backoff delay.
    pub max_delay: Duration,
    /// Jitter factor for down-jitter (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// Whether a response status warrants another attempt.
#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

/// Parse a `Retry-After` header (seconds). Out-of-range values are ignored.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get("retry-after")?.to_str().ok()?.parse::<u64>().ok()?;
    let duration = Duration::from_secs(secs);
    if duration > Duration::ZERO && duration < Duration::from_secs(60) {
        Some(duration)
    } else {
        None
    }
}

/// Delay before retry number `backoff_step`, honoring `Retry-After` when the
/// server sent one, otherwise exponential backoff with down-jitter.
#[must_use]
pub fn retry_delay(backoff_step: u32, config: &RetryConfig, headers: Option<&HeaderMap>) -> Duration {
    if let Some(headers) = headers
        && let Some(delay) = parse_retry_after(headers)
    {
        return delay;
    }
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

async fn capped_error_body(response: Response) -> String {
    match response.text().await {
        Ok(mut body) => {
            if body.len() > MAX_ERROR_BODY_BYTES {
                let mut end = MAX_ERROR_BODY_BYTES;
                while end > 0 && !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
                body.push_str("...(truncated)");
            }
            body
        }
        Err(e) => format!("(unreadable body: {e})"),
    }
}

/// Send a request with automatic retries.
///
/// `build_request` is called once per attempt. Retries on connection errors
/// and retryable HTTP statuses; a non-retryable status or exhausted budget
/// becomes a typed [`SynthesisError`].
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> Result<Response, SynthesisError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let result = build_request().send().await;
        let retries_left = attempt < config.max_retries;

        match result {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if retries_left && should_retry(status) {
                    let delay = retry_delay(attempt, config, Some(response.headers()));
                    tracing::debug!(%status, attempt = attempt + 1, delay_ms = delay.as_millis(), "retrying after error status");
                    tokio::time::sleep(delay).await;
                } else {
                    return Err(SynthesisError::Http {
                        status: status.as_u16(),
                        body: capped_error_body(response).await,
                    });
                }
            }
            Err(e) => {
                if retries_left && (e.is_connect() || e.is_timeout() || e.is_request()) {
                    let delay = retry_delay(attempt, config, None);
                    tracing::debug!(error = %e, attempt = attempt + 1, "retrying after transport error");
                    tokio::time::sleep(delay).await;
                } else {
                    return Err(SynthesisError::Transport {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryConfig, parse_retry_after, retry_delay, should_retry};
    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::time::Duration;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        for code in [408, 409, 429, 500, 502, 503, 504] {
            assert!(should_retry(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for code in [400, 401, 403, 404, 422] {
            assert!(!should_retry(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn retry_after_header_wins_over_backoff() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        let delay = retry_delay(0, &RetryConfig::default(), Some(&headers));
        assert_eq!(delay, Duration::from_secs(3));
    }

    #[test]
    fn out_of_range_retry_after_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("600"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(retry_delay(0, &config, None), Duration::from_millis(500));
        assert_eq!(retry_delay(1, &config, None), Duration::from_secs(1));
        assert_eq!(retry_delay(10, &config, None), config.max_delay);
    }

    #[test]
    fn jitter_only_shrinks_the_delay() {
        let config = RetryConfig::default();
        for _ in 0..32 {
            let delay = retry_delay(2, &config, None);
            assert!(delay <= Duration::from_secs(2));
            assert!(delay >= Duration::from_secs_f64(2.0 * 0.75));
        }
    }
}
