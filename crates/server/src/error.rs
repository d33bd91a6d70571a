use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tts_accelerator_core::Error as CoreError;

/// HTTP-layer error. Wraps the core error type and adds a couple of
/// request-validation variants that only make sense at this layer.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("upstream request failed: {0}")]
    UpstreamError(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Core(e) => StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServerError::Core(e) => match e.code() {
                tts_accelerator_core::ErrorCode::NotFound => "not_found",
                tts_accelerator_core::ErrorCode::InvalidInput => "invalid_input",
                tts_accelerator_core::ErrorCode::ModelNotFound => "model_not_found",
                tts_accelerator_core::ErrorCode::GenerationFailed => "generation_failed",
                tts_accelerator_core::ErrorCode::InternalError => "internal_error",
            },
            ServerError::InvalidInput(_) => "invalid_input",
            ServerError::ModelNotFound(_) => "model_not_found",
            ServerError::UpstreamError(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": "tts_accelerator_error",
                "code": self.code(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        let err = ServerError::InvalidInput("empty text".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn model_not_found_maps_to_404() {
        let err = ServerError::ModelNotFound("bogus".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn core_generation_failed_maps_to_500() {
        let err = ServerError::from(CoreError::GenerationFailed("boom".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "generation_failed");
    }

    #[test]
    fn core_not_found_maps_to_404() {
        let err = ServerError::from(CoreError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }
}
