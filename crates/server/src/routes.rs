use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::chat::chat_completions;
use crate::error::ServerError;
use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Builds the application router over `state`. Middleware order,
/// outside-in: tracing span per request, response compression, CORS
/// (permissive, matching the upstream's development default — this
/// service exposes no per-origin configuration knob), and a request
/// timeout derived from the upstream timeouts.
pub fn create_router(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let timeout = state.get_timeout() + Duration::from_secs(5);

    Router::new()
        .route("/", get(root))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/audio/speech", post(speech))
        .route("/v1/models", get(list_models))
        .route("/health", get(health))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(metrics_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "tts-accelerator",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(serde::Deserialize)]
struct SpeechRequest {
    model: String,
    input: String,
    #[serde(default)]
    #[allow(dead_code)]
    voice: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    response_format: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    speed: Option<f32>,
}

/// `POST /v1/audio/speech`. Only `model` and `input` are honored; `voice`,
/// `response_format`, and `speed` are accepted for OpenAI API
/// compatibility and ignored. Returns the cached audio if already
/// computed, otherwise blocks on (or triggers) synthesis up to the
/// configured per-request timeout.
async fn speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Response, ServerError> {
    if req.input.trim().is_empty() {
        return Err(ServerError::InvalidInput("input must not be empty".into()));
    }
    if req.model != state.default_tts_model() {
        return Err(ServerError::ModelNotFound(req.model));
    }

    let timeout = state.get_timeout();
    match state.cache.get(&req.input, &req.model, timeout, true).await {
        Some(audio) => Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], audio).into_response()),
        None => Err(ServerError::Core(tts_accelerator_core::Error::GenerationFailed(
            "synthesis failed or timed out".into(),
        ))),
    }
}

async fn list_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{
            "id": state.default_tts_model(),
            "object": "model",
            "owned_by": "tts-accelerator",
        }],
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cache_stats": state.cache.stats(),
        "balancer_stats": state.balancer.get_stats(),
    }))
}

async fn cache_stats(State(state): State<AppState>) -> Json<tts_accelerator_core::CacheStats> {
    Json(state.cache.stats())
}

async fn cache_clear(State(state): State<AppState>) -> Json<Value> {
    state.cache.clear();
    Json(json!({ "status": "success" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use tts_accelerator_config::Settings;

    fn test_state() -> AppState {
        let mut settings = Settings::default();
        settings.newapi_base_url = "https://newapi.example.com".to_string();
        settings.newapi_api_key = "sk-test".to_string();
        settings.tts_endpoints = "http://127.0.0.1:1".to_string();
        AppState::new(settings).unwrap()
    }

    #[tokio::test]
    async fn health_reports_status_ok() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn root_reports_service_banner() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn models_lists_configured_default() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let response = app
            .oneshot(Request::builder().uri("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"][0]["id"], "liang");
    }

    #[tokio::test]
    async fn speech_rejects_empty_input() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let body = json!({"model": "liang", "input": ""}).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/audio/speech")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn speech_rejects_unknown_model() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let body = json!({"model": "not-configured", "input": "hello"}).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/audio/speech")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cache_clear_resets_stats() {
        let app = create_router(test_state(), metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
