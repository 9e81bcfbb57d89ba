use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::artifact::is_writable_dir;
use super::SpeechEngine;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: HealthState,
    pub engine_version: Option<String>,
    pub free_space_mb: Option<u64>,
    pub error: Option<String>,
}

impl HealthStatus {
    fn healthy(version: String, free_space_mb: Option<u64>) -> Self {
        Self {
            status: HealthState::Healthy,
            engine_version: Some(version),
            free_space_mb,
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            engine_version: None,
            free_space_mb: None,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Read-only availability checks for an engine and its output directory.
///
/// Checks run cheapest first and stop at the first failure, so when several
/// things are broken the reported reason is always the earliest in this list:
/// binary, model, self-test, output directory.
pub struct EngineProbe {
    engine: Arc<dyn SpeechEngine>,
    output_dir: PathBuf,
}

impl EngineProbe {
    pub fn new(engine: Arc<dyn SpeechEngine>, output_dir: PathBuf) -> Self {
        Self { engine, output_dir }
    }

    pub async fn check_health(&self) -> HealthStatus {
        if let Err(e) = self.engine.check_resources() {
            return HealthStatus::unhealthy(e.to_string());
        }

        let version = match self.engine.self_test().await {
            Ok(version) => version,
            Err(e) => return HealthStatus::unhealthy(e.to_string()),
        };

        if !is_writable_dir(&self.output_dir) {
            return HealthStatus::unhealthy(format!(
                "output directory missing or not writable: {}",
                self.output_dir.display()
            ));
        }

        let free_space_mb = match fs2::available_space(&self.output_dir) {
            Ok(bytes) => Some(bytes / BYTES_PER_MB),
            Err(e) => {
                warn!("Could not read free space for {}: {}", self.output_dir.display(), e);
                None
            }
        };

        debug!(engine = self.engine.name(), version = %version, "Engine healthy");

        HealthStatus::healthy(version, free_space_mb)
    }
}
