use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SynthesisError;

/// A waveform written by one successful synthesis call.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Checks that the engine left a non-empty RIFF/WAVE file at `path`.
///
/// The exit code of the engine is not trusted on its own: Piper can exit 0
/// without writing anything (e.g. an unwritable target).
pub async fn verify(name: &str, path: &Path) -> Result<Artifact, SynthesisError> {
    let size_bytes = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
        _ => return Err(SynthesisError::EngineError("output not produced".into())),
    };

    let wav_path = path.to_path_buf();
    let duration = tokio::task::spawn_blocking(move || wav_duration(&wav_path))
        .await
        .map_err(|e| SynthesisError::EngineError(format!("failed to inspect output: {}", e)))??;

    Ok(Artifact {
        name: name.to_string(),
        path: path.to_path_buf(),
        size_bytes,
        duration,
    })
}

fn wav_duration(path: &Path) -> Result<Duration, SynthesisError> {
    let reader = hound::WavReader::open(path).map_err(|e| {
        SynthesisError::EngineError(format!("output is not a valid waveform: {}", e))
    })?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SynthesisError::EngineError(
            "output is not a valid waveform: zero sample rate".into(),
        ));
    }
    let frames = reader.duration() as u64;
    Ok(Duration::from_millis(frames * 1000 / spec.sample_rate as u64))
}

/// Lists `.wav` files in `dir`, newest first.
///
/// Artifact names sort by creation time, so ordering is by name rather than
/// by filesystem timestamps.
pub fn list(dir: &Path, limit: usize) -> std::io::Result<Vec<ArtifactInfo>> {
    let mut artifacts = Vec::new();

    if !dir.is_dir() {
        return Ok(artifacts);
    }

    for entry in std::fs::read_dir(dir)? {
        let Some(entry) = skip_vanished(entry)? else {
            continue;
        };
        let path = entry.path();

        if !path.extension().map(|e| e == "wav").unwrap_or(false) {
            continue;
        }

        let Some(meta) = skip_vanished(entry.metadata())? else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        artifacts.push(ArtifactInfo {
            name,
            size_bytes: meta.len(),
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
        });
    }

    artifacts.sort_by(|a, b| b.name.cmp(&a.name));
    artifacts.truncate(limit);

    Ok(artifacts)
}

/// Files can be cleaned up externally while a listing is in progress.
fn skip_vanished<T>(result: std::io::Result<T>) -> std::io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether this process may create files in `dir`.
pub fn is_writable_dir(dir: &Path) -> bool {
    dir.is_dir() && can_write(dir)
}

#[cfg(unix)]
fn can_write(dir: &Path) -> bool {
    use rustix::fs::{access, Access};

    access(dir, Access::WRITE_OK | Access::EXEC_OK).is_ok()
}

#[cfg(not(unix))]
fn can_write(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Deletes the output file on drop unless [`PartialOutput::keep`] is called,
/// so failed or cancelled calls leave nothing behind.
pub struct PartialOutput {
    path: PathBuf,
    keep: bool,
}

impl PartialOutput {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Removed partial output {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
