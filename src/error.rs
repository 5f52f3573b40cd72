use axum::http::StatusCode;
use thiserror::Error;

/// Per-request failure. Every variant except `Validation` is an internal
/// failure from the caller's point of view.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid JSON data or missing 'url' field")]
    Validation,
    #[error("failed to fetch image: {0}")]
    Fetch(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to encode payload: {0}")]
    Encode(String),
    #[error("mqtt publish failed: {0}")]
    Transport(String),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Anything that keeps the process from coming up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to load model: {0}")]
    Model(String),
    #[error("failed to load font {path}: {reason}")]
    Font { path: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
