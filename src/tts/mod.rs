pub mod artifact;
pub mod namer;
pub mod piper;
pub mod probe;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::SynthesisError;

pub use artifact::{Artifact, ArtifactInfo, PartialOutput};
pub use namer::ArtifactNamer;
pub use piper::PiperEngine;
pub use probe::{EngineProbe, HealthState, HealthStatus};

/// Result of one synthesis call.
pub type SynthesisOutcome = Result<Artifact, SynthesisError>;

/// A text-to-speech engine that renders text into a waveform file.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap filesystem checks, in the order they should be reported.
    fn check_resources(&self) -> Result<(), SynthesisError>;

    /// Lightweight invocation proving the engine runs; returns its version.
    async fn self_test(&self) -> Result<String, SynthesisError>;

    /// Render `text` into `output`. Implementations must not return before
    /// any process they started has exited.
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: u32,
        output: &Path,
    ) -> Result<(), SynthesisError>;
}

pub struct TtsService {
    engine: Arc<dyn SpeechEngine>,
    namer: ArtifactNamer,
    output_dir: PathBuf,
    max_text_chars: usize,
}

impl TtsService {
    pub fn new(engine: Arc<dyn SpeechEngine>, output_dir: PathBuf) -> Self {
        Self {
            engine,
            namer: ArtifactNamer::default(),
            output_dir,
            max_text_chars: 10_000,
        }
    }

    pub fn with_max_text_chars(mut self, max: usize) -> Self {
        self.max_text_chars = max;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn probe(&self) -> EngineProbe {
        EngineProbe::new(Arc::clone(&self.engine), self.output_dir.clone())
    }

    pub async fn synthesize(&self, text: &str, speaker_id: u32) -> SynthesisOutcome {
        // 1. Validate
        if text.trim().is_empty() {
            return Err(SynthesisError::InvalidInput("Text cannot be empty".into()));
        }

        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(SynthesisError::InvalidInput(format!(
                "Text too long ({} chars, max {})",
                chars, self.max_text_chars
            )));
        }

        // 2. Resources must be in place before anything is launched
        self.engine.check_resources()?;
        if !artifact::is_writable_dir(&self.output_dir) {
            return Err(SynthesisError::ResourceMissing(format!(
                "output directory missing or not writable: {}",
                self.output_dir.display()
            )));
        }

        // 3. Render
        let name = self.namer.next_name();
        let path = self.output_dir.join(&name);

        // Removes the file on every exit path, including the caller dropping this future.
        let partial = PartialOutput::new(path.clone());
        let result = match self.engine.synthesize(text, speaker_id, &path).await {
            Ok(()) => artifact::verify(&name, &path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(artifact) => {
                info!(
                    engine = self.engine.name(),
                    artifact = %artifact.name,
                    bytes = artifact.size_bytes,
                    duration_ms = artifact.duration.as_millis() as u64,
                    "Synthesized {} chars",
                    chars
                );
                partial.keep();
                Ok(artifact)
            }
            Err(e) => {
                drop(partial);
                warn!(
                    engine = self.engine.name(),
                    kind = e.kind().as_str(),
                    "Synthesis failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        self.probe().check_health().await
    }

    pub fn list_artifacts(&self, limit: usize) -> std::io::Result<Vec<ArtifactInfo>> {
        artifact::list(&self.output_dir, limit)
    }
}
