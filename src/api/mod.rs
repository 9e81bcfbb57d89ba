pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::tts::{ArtifactInfo, HealthState, HealthStatus};

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    /// Forwarded to the engine only when it is configured as multi-speaker.
    #[serde(default)]
    pub speaker_id: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub piper_version: Option<String>,
    /// Free space in the output directory, in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<HealthStatus> for HealthResponse {
    fn from(status: HealthStatus) -> Self {
        Self {
            status: status.status,
            piper_version: status.engine_version,
            disk_space: status.free_space_mb,
            error: status.error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtifactsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactsResponse {
    pub artifacts: Vec<ArtifactInfo>,
}
