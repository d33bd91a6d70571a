use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type. Every fallible operation in the balancer, cache,
/// splitter and orchestrator crates returns this type so the HTTP layer can
/// map failures to the client-facing error body uniformly.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no available TTS endpoints")]
    NoAvailableEndpoints,

    #[error("TTS request failed: {0}")]
    GenerationFailed(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The stable error code surfaced in the client-facing error body.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NoAvailableEndpoints | Error::GenerationFailed(_) => ErrorCode::GenerationFailed,
            Error::ModelNotFound(_) => ErrorCode::ModelNotFound,
            Error::InvalidInput(_) => ErrorCode::InvalidInput,
            Error::NotFound => ErrorCode::NotFound,
            Error::Config(_) | Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status code this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Error::NotFound => 404,
            Error::ModelNotFound(_) => 404,
            Error::InvalidInput(_) => 400,
            Error::NoAvailableEndpoints | Error::GenerationFailed(_) => 500,
            Error::Config(_) | Error::Internal(_) => 500,
        }
    }

    /// Renders the `{"error": {...}}` body shape expected by clients.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                error_type: "tts_accelerator_error".to_string(),
                code: self.code(),
            },
        }
    }
}

/// The stable, machine-readable codes used in the client-facing error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    InvalidInput,
    ModelNotFound,
    GenerationFailed,
    InternalError,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: ErrorCode,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_not_found_maps_to_404() {
        let err = Error::ModelNotFound("bogus".into());
        assert_eq!(err.status(), 404);
        assert_eq!(err.code(), ErrorCode::ModelNotFound);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let err = Error::InvalidInput("empty text".into());
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn generation_failed_maps_to_500() {
        let err = Error::GenerationFailed("boom".into());
        assert_eq!(err.status(), 500);
        assert_eq!(err.code(), ErrorCode::GenerationFailed);
    }
}
