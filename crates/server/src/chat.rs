//! `POST /v1/chat/completions`.
//!
//! Proxies the client's OpenAI-shaped payload to the upstream
//! chat-completion provider, stripping the two TTS-specific fields before
//! forwarding. A streaming upstream response is wrapped in the prefetch
//! orchestrator so the client sees the exact same bytes, in the same
//! order, while segments are concurrently submitted for synthesis; a
//! non-streaming response is passed through and, if TTS is enabled, its
//! full message content is split and submitted once the response is in
//! hand.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tts_accelerator_splitter::Splitter;
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::AppState;

fn default_true() -> bool {
    true
}

/// The two fields this service adds to the OpenAI chat-completions
/// request; everything else is captured by `rest` and forwarded verbatim.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default = "default_true")]
    pub tts_enabled: bool,
    #[serde(default)]
    pub tts_model: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

pub async fn chat_completions(
    State(state): State<AppState>,
    Json(req): Json<ChatCompletionRequest>,
) -> Result<Response, ServerError> {
    let tts_model = req.tts_model.unwrap_or_else(|| state.default_tts_model());
    let is_streaming = req
        .rest
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let base_url = state.newapi_base_url();
    let upstream = state
        .upstream_client
        .post(format!("{base_url}/v1/chat/completions"))
        .bearer_auth(state.newapi_api_key())
        .json(&Value::Object(req.rest))
        .send()
        .await
        .map_err(|e| ServerError::UpstreamError(e.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if !is_streaming {
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| ServerError::UpstreamError(e.to_string()))?;
        if req.tts_enabled {
            submit_non_streaming_content(&state, &bytes, &tts_model);
        }
        return Ok((status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response());
    }

    let request_id = Uuid::new_v4().to_string();
    let byte_stream = upstream.bytes_stream();

    let body = if req.tts_enabled {
        let wrapped = state
            .orchestrator
            .prefetch_stream(request_id, tts_model, byte_stream);
        Body::from_stream(wrapped)
    } else {
        Body::from_stream(byte_stream)
    };

    Ok((
        status,
        [(header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
        .into_response())
}

/// Extracts `choices[0].message.content` from a non-streaming
/// chat-completion response and submits it for prefetch. Splitter errors
/// are not possible here (malformed JSON just means nothing to submit);
/// the client-facing response is already built and unaffected either way.
fn submit_non_streaming_content(state: &AppState, bytes: &[u8], tts_model: &str) {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return;
    };
    let Some(content) = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
    else {
        return;
    };

    let mut splitter = Splitter::new(state.splitter_config());
    for segment in splitter.feed(content) {
        state.cache.submit(&segment, tts_model);
    }
    for segment in splitter.flush() {
        state.cache.submit(&segment, tts_model);
    }
}
