use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{ArtifactsQuery, ArtifactsResponse, HealthResponse, SynthesizeRequest};
use crate::api::routes::AppState;
use crate::error::AppError;

const DEFAULT_LIST_LIMIT: usize = 10;
const MAX_LIST_LIMIT: usize = 1000;

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let artifact = state
        .tts
        .synthesize(&request.text, request.speaker_id)
        .await?;

    let wav = tokio::fs::read(&artifact.path).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.name),
            ),
            (
                header::HeaderName::from_static("x-audio-duration-ms"),
                artifact.duration.as_millis().to_string(),
            ),
        ],
        wav,
    )
        .into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let status = state.tts.check_health().await;

    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        tracing::warn!(
            "Health check failed: {}",
            status.error.as_deref().unwrap_or("unknown")
        );
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(HealthResponse::from(status))).into_response()
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArtifactsQuery>,
) -> Result<Json<ArtifactsResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let artifacts = state.tts.list_artifacts(limit)?;
    Ok(Json(ArtifactsResponse { artifacts }))
}
