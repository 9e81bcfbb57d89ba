use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::SpeechEngine;
use crate::error::SynthesisError;

/// Drives the Piper command line: `piper --model M --output_file O` with the
/// text on stdin.
#[derive(Debug, Clone)]
pub struct PiperEngine {
    binary: PathBuf,
    model: PathBuf,
    timeout: Duration,
    self_test_timeout: Duration,
    speaker_arg: bool,
}

impl PiperEngine {
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            self_test_timeout: Duration::from_secs(5),
            speaker_arg: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_self_test_timeout(mut self, timeout: Duration) -> Self {
        self.self_test_timeout = timeout;
        self
    }

    /// Forward `speaker_id` as `--speaker`. Only meaningful for multi-speaker
    /// models.
    pub fn with_speaker_arg(mut self, enabled: bool) -> Self {
        self.speaker_arg = enabled;
        self
    }
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    fn name(&self) -> &str {
        "piper"
    }

    fn check_resources(&self) -> Result<(), SynthesisError> {
        if !is_executable(&self.binary) {
            return Err(SynthesisError::ResourceMissing(format!(
                "engine binary missing: {}",
                self.binary.display()
            )));
        }

        if !self.model.is_file() {
            return Err(SynthesisError::ResourceMissing(format!(
                "model missing: {}",
                self.model.display()
            )));
        }

        Ok(())
    }

    async fn self_test(&self) -> Result<String, SynthesisError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?cmd, "Running piper self-test");

        let mut child = cmd.spawn().map_err(|e| {
            SynthesisError::EngineError(format!("engine self-test failed: {}", e))
        })?;

        let mut stdout = drain(child.stdout.take());
        let mut stderr = drain(child.stderr.take());

        let run = async {
            let status = child.wait().await?;
            let out = collect(&mut stdout).await;
            let err = collect(&mut stderr).await;
            Ok::<_, std::io::Error>((status, out, err))
        };

        let (status, stdout, stderr) = match timeout(self.self_test_timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                reap(&mut child).await;
                stdout.abort();
                stderr.abort();
                return Err(SynthesisError::EngineError(format!(
                    "engine self-test failed: {}",
                    e
                )));
            }
            Err(_) => {
                reap(&mut child).await;
                stdout.abort();
                stderr.abort();
                return Err(SynthesisError::EngineError(format!(
                    "engine self-test failed: no response within {}s",
                    self.self_test_timeout.as_secs_f32()
                )));
            }
        };

        if !status.success() {
            return Err(SynthesisError::EngineError(format!(
                "engine self-test failed ({}): {}",
                status,
                stderr.trim()
            )));
        }

        let version = first_line(&stdout)
            .or_else(|| first_line(&stderr))
            .unwrap_or("unknown")
            .to_string();

        Ok(version)
    }

    async fn synthesize(
        &self,
        text: &str,
        speaker_id: u32,
        output: &Path,
    ) -> Result<(), SynthesisError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(output);
        if self.speaker_arg {
            cmd.arg("--speaker").arg(speaker_id.to_string());
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?cmd, "Running piper");

        let mut child = cmd.spawn().map_err(|e| {
            SynthesisError::EngineError(format!("failed to launch engine: {}", e))
        })?;

        let mut diagnostics = drain(child.stderr.take());
        let stdin = child.stdin.take();

        // The deadline covers the stderr read too: a helper process the engine
        // left behind can hold the pipe open after the engine itself exits.
        let run = async {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(text.as_bytes()).await {
                    Ok(()) => {}
                    // The engine quit without reading; its exit status tells us why.
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                    Err(e) => return Err(e),
                }
                drop(stdin);
            }
            let status = child.wait().await?;
            let stderr = collect(&mut diagnostics).await;
            Ok::<_, std::io::Error>((status, stderr))
        };

        match timeout(self.timeout, run).await {
            Ok(Ok((status, stderr))) => {
                if status.success() {
                    Ok(())
                } else {
                    Err(SynthesisError::EngineError(format!(
                        "engine exited with {}: {}",
                        status,
                        stderr.trim()
                    )))
                }
            }
            Ok(Err(e)) => {
                reap(&mut child).await;
                diagnostics.abort();
                Err(SynthesisError::EngineError(format!(
                    "engine I/O failed: {}",
                    e
                )))
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs_f32(),
                    "Piper exceeded time limit, killing"
                );
                reap(&mut child).await;
                diagnostics.abort();
                Err(SynthesisError::Timeout(self.timeout))
            }
        }
    }
}

fn drain<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            if let Err(e) = stream.read_to_end(&mut buf).await {
                debug!("Stopped reading piper output: {}", e);
            }
        }
        buf
    })
}

async fn collect(handle: &mut JoinHandle<Vec<u8>>) -> String {
    match handle.await {
        Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => {
            warn!("Piper output reader failed: {}", e);
            String::new()
        }
    }
}

/// Kills the child and waits for it so no zombie is left behind.
async fn reap(child: &mut tokio::process::Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill piper process: {}", e);
    }
}

fn first_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).find(|l| !l.is_empty())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
