use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Fixed message returned while the provider credential is unusable.
pub const CONFIGURATION_MESSAGE: &str = "API key is missing or invalid";

/// Errors surfaced to callers of the study-plan and quiz endpoints
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Empty generation result: {0}")]
    EmptyGenerationResult(String),
}

/// Stable, caller-visible classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ConfigurationError,
    InvalidRequest,
    ModelUnavailable,
    MalformedModelOutput,
    EmptyGenerationResult,
}

impl ErrorKind {
    /// Status string used in the callable error envelope.
    pub fn callable_status(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "FAILED_PRECONDITION",
            ErrorKind::InvalidRequest => "INVALID_ARGUMENT",
            ErrorKind::ModelUnavailable => "UNAVAILABLE",
            ErrorKind::MalformedModelOutput => "INTERNAL",
            ErrorKind::EmptyGenerationResult => "NOT_FOUND",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::ConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::MalformedModelOutput | ErrorKind::EmptyGenerationResult => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Configuration(_) => ErrorKind::ConfigurationError,
            ServiceError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ServiceError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            ServiceError::MalformedModelOutput(_) => ErrorKind::MalformedModelOutput,
            ServiceError::EmptyGenerationResult(_) => ErrorKind::EmptyGenerationResult,
        }
    }

    /// Human-readable detail without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            ServiceError::Configuration(d)
            | ServiceError::InvalidRequest(d)
            | ServiceError::ModelUnavailable(d)
            | ServiceError::MalformedModelOutput(d)
            | ServiceError::EmptyGenerationResult(d) => d,
        }
    }
}

/// Errors raised by a generation provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to deserialize: {0}")]
    Decode(String),

    #[error("Provider returned empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}
