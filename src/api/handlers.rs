use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::upstream::{self, UpstreamError};

use super::models::{ChatReply, ChatRequest, ErrorResponse, PingResponse};

const METHOD_NOT_ALLOWED_MSG: &str = "Method not allowed (GET 仅支持 ?ping=1)";
const TOKEN_TIP: &str = "hfTokenPresent 为 true 表示环境变量 HF_TOKEN 已配置好。";

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct PingQuery {
    ping: Option<String>,
}

/// `GET /chat?ping=1` reports configuration health without calling upstream.
/// A plain GET without the flag is a method error.
pub async fn health(
    State(cfg): State<Arc<AppConfig>>,
    Query(query): Query<PingQuery>,
) -> Result<Json<PingResponse>, ApiError> {
    if query.ping.as_deref() != Some("1") {
        return Err(method_not_allowed_body());
    }

    tracing::debug!("GET /chat ping probe, token present: {}", cfg.hf_token.is_some());
    Ok(Json(PingResponse {
        ok: true,
        route: "/chat",
        model: cfg.model.clone(),
        hf_token_present: cfg.hf_token.is_some(),
        tip: TOKEN_TIP,
    }))
}

pub async fn chat(
    State(cfg): State<Arc<AppConfig>>,
    payload: Option<Json<ChatRequest>>,
) -> Result<Json<ChatReply>, ApiError> {
    let message = payload.map(|Json(body)| body.message).unwrap_or_default();
    let message = message.trim();
    tracing::info!(
        "POST /chat, {} bytes, token present: {}",
        message.len(),
        cfg.hf_token.is_some()
    );

    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing message")),
        ));
    }

    match upstream::generate(message, &cfg).await {
        Ok(reply) => {
            tracing::debug!("reply: {}", preview(&reply, 120));
            Ok(Json(ChatReply { reply }))
        }
        Err(err) => Err(error_response(err)),
    }
}

/// Fallback for unsupported methods on `/chat`.
pub async fn method_not_allowed() -> ApiError {
    method_not_allowed_body()
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found")),
    )
        .into_response()
}

fn method_not_allowed_body() -> ApiError {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new(METHOD_NOT_ALLOWED_MSG)),
    )
}

fn error_response(err: UpstreamError) -> ApiError {
    match err {
        UpstreamError::MissingToken => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("HF_TOKEN not found in environment")),
        ),
        UpstreamError::Status { status, body } => {
            tracing::error!("HF_API_ERROR {}: {}", status, preview(&body, 200));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: Some(status.as_u16()),
                    details: Some(body),
                    ..ErrorResponse::new("HF_API_ERROR")
                }),
            )
        }
        UpstreamError::Malformed { raw } => {
            tracing::error!("HF_API_PARSE_ERROR: {}", preview(&raw, 200));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    raw: Some(raw),
                    ..ErrorResponse::new("HF_API_PARSE_ERROR")
                }),
            )
        }
        other => {
            tracing::error!("SERVER_ERROR: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    message: Some(other.to_string()),
                    ..ErrorResponse::new("SERVER_ERROR")
                }),
            )
        }
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("夜空AI在听", 2), "夜空");
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("", 10), "");
    }
}
