use std::env;
use std::time::Duration;

use axum::http::StatusCode;

pub const DEFAULT_MODEL: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Which request shape the inference endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    /// `POST <base>/models/<model>` with an `inputs` prompt string.
    Raw,
    /// `POST <base>/v1/chat/completions` with a `messages` array.
    Chat,
}

/// Retry behavior for transient upstream statuses (model loading, rate limit).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn is_transient(&self, status: StatusCode) -> bool {
        status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(1_500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer token for the inference endpoint. Kept optional so the server
    /// can still come up and answer the ping diagnostic when it is missing.
    pub hf_token: Option<String>,
    pub model: String,
    pub base_url: String,
    pub style: ApiStyle,
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Resolve configuration from the environment once, at startup.
    pub fn from_env() -> Self {
        let backoff_ms = env::var("HF_RETRY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(1_500);

        Self {
            hf_token: env::var("HF_TOKEN").ok().filter(|token| !token.is_empty()),
            model: env::var("HF_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("HF_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            style: match env::var("HF_API_STYLE").as_deref() {
                Ok("chat") => ApiStyle::Chat,
                _ => ApiStyle::Raw,
            },
            timeout_ms: env::var("HF_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(20_000),
            retry: RetryPolicy {
                backoff: Duration::from_millis(backoff_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_loading_and_rate_limit_statuses_are_transient() {
        let policy = RetryPolicy::default();
        assert!(policy.is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(policy.is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.is_transient(StatusCode::OK));
        assert!(!policy.is_transient(StatusCode::NOT_FOUND));
        assert!(!policy.is_transient(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn default_policy_is_a_single_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff, Duration::from_millis(1_500));
    }
}
