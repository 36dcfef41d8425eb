use std::error::Error;
use std::fmt;

use axum::http::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tokio::time::{sleep, timeout, Duration};

use crate::config::{ApiStyle, AppConfig};
use crate::reply::extract_reply;

/// Persona prepended to every prompt; the model answers in this voice.
pub const SYSTEM_PROMPT: &str =
    "你是夜空AI，一个温柔体贴的中文聊天伙伴。请用简短、安抚的语气回复，让用户感到被理解。";

#[derive(Debug)]
pub enum UpstreamError {
    MissingToken,
    BadToken(reqwest::header::InvalidHeaderValue),
    Timeout,
    Transport(reqwest::Error),
    Status { status: StatusCode, body: String },
    Malformed { raw: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "HF_TOKEN not found in environment"),
            Self::BadToken(err) => write!(f, "HF_TOKEN is not a valid header value: {err}"),
            Self::Timeout => write!(f, "inference request timed out"),
            Self::Transport(err) => write!(f, "failed to reach inference endpoint: {err}"),
            Self::Status { status, body } => {
                write!(f, "inference endpoint returned {status}: {body}")
            }
            Self::Malformed { raw } => {
                write!(f, "inference endpoint returned a non-JSON body: {raw}")
            }
        }
    }
}

impl Error for UpstreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BadToken(err) => Some(err),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

struct RawReply {
    status: StatusCode,
    body: String,
}

/// Relay one message to the inference endpoint and extract the reply text,
/// retrying per the configured policy while the endpoint reports a transient
/// status (model still loading, rate limited).
pub async fn generate(message: &str, cfg: &AppConfig) -> Result<String, UpstreamError> {
    let token = cfg.hf_token.as_deref().ok_or(UpstreamError::MissingToken)?;
    let url = endpoint(cfg);
    let payload = build_payload(message, cfg);
    let client = reqwest::Client::new();

    let mut out = call_once(&client, &url, token, &payload, cfg.timeout_ms).await?;
    let mut attempts = 0;
    while attempts < cfg.retry.max_retries && cfg.retry.is_transient(out.status) {
        tracing::info!(
            "inference endpoint answered {}, retrying in {:?}",
            out.status,
            cfg.retry.backoff
        );
        sleep(cfg.retry.backoff).await;
        out = call_once(&client, &url, token, &payload, cfg.timeout_ms).await?;
        attempts += 1;
    }

    if !out.status.is_success() {
        return Err(UpstreamError::Status {
            status: out.status,
            body: out.body,
        });
    }

    tracing::debug!("inference endpoint answered {}", out.status);
    extract_reply(&out.body).map_err(|raw| UpstreamError::Malformed { raw })
}

async fn call_once(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    payload: &serde_json::Value,
    timeout_ms: u64,
) -> Result<RawReply, UpstreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let bearer =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(UpstreamError::BadToken)?;
    headers.insert(AUTHORIZATION, bearer);

    let fut = client.post(url).headers(headers).json(payload).send();
    let response = timeout(Duration::from_millis(timeout_ms), fut)
        .await
        .map_err(|_| UpstreamError::Timeout)?
        .map_err(UpstreamError::Transport)?;

    let status = response.status();
    let body = response.text().await.map_err(UpstreamError::Transport)?;
    Ok(RawReply { status, body })
}

fn endpoint(cfg: &AppConfig) -> String {
    match cfg.style {
        ApiStyle::Raw => format!("{}/models/{}", cfg.base_url, cfg.model),
        ApiStyle::Chat => format!("{}/v1/chat/completions", cfg.base_url),
    }
}

fn build_payload(message: &str, cfg: &AppConfig) -> serde_json::Value {
    match cfg.style {
        ApiStyle::Raw => json!({
            "inputs": format!("{SYSTEM_PROMPT}\n\n用户：{message}\n夜空AI："),
            "parameters": {
                "max_new_tokens": 180,
                "temperature": 0.8,
                "top_p": 0.95,
                "return_full_text": false,
            },
            // wait_for_model keeps a cold model from answering 503 outright
            "options": { "wait_for_model": true, "use_cache": true },
        }),
        ApiStyle::Chat => json!({
            "model": cfg.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": message },
            ],
            "temperature": 0.8,
            "max_tokens": 300,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;

    fn config(style: ApiStyle) -> AppConfig {
        AppConfig {
            hf_token: Some("hf_x".to_string()),
            model: "org/model".to_string(),
            base_url: "https://api-inference.huggingface.co".to_string(),
            style,
            timeout_ms: 1_000,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn raw_style_posts_to_the_model_endpoint() {
        assert_eq!(
            endpoint(&config(ApiStyle::Raw)),
            "https://api-inference.huggingface.co/models/org/model"
        );
    }

    #[test]
    fn chat_style_posts_to_the_completions_endpoint() {
        assert_eq!(
            endpoint(&config(ApiStyle::Chat)),
            "https://api-inference.huggingface.co/v1/chat/completions"
        );
    }

    #[test]
    fn raw_payload_wraps_the_message_in_the_persona_prompt() {
        let payload = build_payload("睡不着", &config(ApiStyle::Raw));
        let inputs = payload["inputs"].as_str().unwrap();
        assert!(inputs.starts_with(SYSTEM_PROMPT));
        assert!(inputs.contains("用户：睡不着"));
        assert!(inputs.ends_with("夜空AI："));
        assert_eq!(payload["parameters"]["max_new_tokens"], 180);
        assert_eq!(payload["parameters"]["return_full_text"], false);
        assert_eq!(payload["options"]["wait_for_model"], true);
    }

    #[test]
    fn chat_payload_carries_system_and_user_roles() {
        let payload = build_payload("hello", &config(ApiStyle::Chat));
        assert_eq!(payload["model"], "org/model");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["max_tokens"], 300);
    }
}
