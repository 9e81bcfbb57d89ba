use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Classification of a failed synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    ResourceMissing,
    EngineError,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::ResourceMissing => "resource_missing",
            FailureKind::EngineError => "engine_error",
            FailureKind::Timeout => "timeout",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ResourceMissing(String),

    #[error("{0}")]
    EngineError(String),

    #[error("engine did not finish within {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

impl SynthesisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SynthesisError::InvalidInput(_) => FailureKind::InvalidInput,
            SynthesisError::ResourceMissing(_) => FailureKind::ResourceMissing,
            SynthesisError::EngineError(_) => FailureKind::EngineError,
            SynthesisError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match &self {
            AppError::Synthesis(e) => {
                let status = match e.kind() {
                    FailureKind::InvalidInput => StatusCode::BAD_REQUEST,
                    FailureKind::ResourceMissing => StatusCode::SERVICE_UNAVAILABLE,
                    FailureKind::EngineError => StatusCode::INTERNAL_SERVER_ERROR,
                    FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                };
                (status, e.kind().as_str(), e.to_string())
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                FailureKind::InvalidInput.as_str(),
                msg.clone(),
            ),
            AppError::IoError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                e.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {} - {}", kind, detail);
        } else {
            tracing::warn!("Request rejected: {} - {}", kind, detail);
        }

        (
            status,
            Json(ErrorResponse {
                detail,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

/// Startup configuration failures.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
