//! Fixtures shared by the unit tests: WAV files, fake Piper executables and
//! an in-process engine stub.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::SynthesisError;
use crate::tts::SpeechEngine;

pub fn write_wav(path: &Path, sample_rate: u32, samples: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..samples {
        writer.write_sample(((i % 64) as i16 - 32) * 256).unwrap();
    }
    writer.finalize().unwrap();
}

#[cfg(unix)]
/// Executable shell scripts that honour the Piper command-line contract.
pub struct FakeEngines {
    pub model: PathBuf,
    /// Writes a valid WAV, plus `<out>.args` and `<out>.stdin`.
    pub ok: PathBuf,
    /// Exits 0 without writing anything.
    pub silent: PathBuf,
    /// Exits 0 after writing bytes that are not a waveform.
    pub junk: PathBuf,
    /// Prints a diagnostic to stderr and exits 3.
    pub failing: PathBuf,
    /// Floods stderr before reading stdin.
    pub chatty: PathBuf,
    /// Records its PID in `<out>.pid` and sleeps.
    pub slow: PathBuf,
    /// Writes a valid WAV and exits 0, leaving a background `sleep` that
    /// keeps stderr open.
    pub lingering: PathBuf,
    /// Answers `--version` by recording its PID in `hung_version_pid` and
    /// sleeping.
    pub hung_version: PathBuf,
    pub hung_version_pid: PathBuf,
}

#[cfg(unix)]
const PARSE_ARGS: &str = r#"out=""
VERSION_REQUESTED=""
args="$*"
while [ $# -gt 0 ]; do
  case "$1" in
    --version) VERSION_REQUESTED=1 ;;
    --output_file) out="$2"; shift ;;
  esac
  shift
done
"#;

#[cfg(unix)]
/// Scripts are written once per test binary; every test that spawns a
/// process goes through here first, so no script is exec'd while another
/// thread still holds it open for writing.
pub fn fake_engines() -> &'static FakeEngines {
    static FAKES: OnceLock<FakeEngines> = OnceLock::new();
    FAKES.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("piper-synth-fakes-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let template = dir.join("template.wav");
        write_wav(&template, 22050, 2205);

        let model = dir.join("voice.onnx");
        std::fs::write(&model, b"not really onnx").unwrap();

        let version_exit = "if [ -n \"$VERSION_REQUESTED\" ]; then echo \"1.2.0\"; exit 0; fi\n";

        let ok = script(
            &dir,
            "piper-ok",
            &format!(
                "{PARSE_ARGS}{version_exit}printf '%s' \"$args\" > \"$out.args\"\ncat > \"$out.stdin\"\ncp \"{}\" \"$out\"\n",
                template.display()
            ),
        );
        let silent = script(
            &dir,
            "piper-silent",
            &format!("{PARSE_ARGS}{version_exit}cat > /dev/null\nexit 0\n"),
        );
        let junk = script(
            &dir,
            "piper-junk",
            &format!("{PARSE_ARGS}{version_exit}cat > /dev/null\nprintf 'garbage' > \"$out\"\n"),
        );
        let failing = script(
            &dir,
            "piper-failing",
            "cat > /dev/null\necho \"voice model is corrupt\" >&2\nexit 3\n",
        );
        let chatty = script(
            &dir,
            "piper-chatty",
            &format!(
                "{PARSE_ARGS}{version_exit}i=0\nwhile [ $i -lt 2000 ]; do\n  echo \"progress $i: phonemizing sentence, synthesizing audio chunk, writing frames\" >&2\n  i=$((i+1))\ndone\ncat > /dev/null\ncp \"{}\" \"$out\"\n",
                template.display()
            ),
        );
        let slow = script(
            &dir,
            "piper-slow",
            &format!("{PARSE_ARGS}if [ -n \"$out\" ]; then echo $$ > \"$out.pid\"; fi\nexec sleep 30\n"),
        );

        let lingering = script(
            &dir,
            "piper-lingering",
            &format!(
                "{PARSE_ARGS}{version_exit}cat > /dev/null\ncp \"{}\" \"$out\"\n(sleep 5) &\nexit 0\n",
                template.display()
            ),
        );
        let hung_version_pid = dir.join("hung-version.pid");
        let hung_version = script(
            &dir,
            "piper-hung-version",
            &format!(
                "{PARSE_ARGS}if [ -n \"$VERSION_REQUESTED\" ]; then echo $$ > \"{}\"; fi\nexec sleep 30\n",
                hung_version_pid.display()
            ),
        );

        FakeEngines {
            model,
            ok,
            silent,
            junk,
            failing,
            chatty,
            slow,
            lingering,
            hung_version,
            hung_version_pid,
        }
    })
}

#[cfg(unix)]
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    Ok,
    Silent,
    Failing,
    Missing,
    TimedOut,
    /// Writes the start of an output file, then never finishes.
    Hang,
}

/// In-process engine that never spawns anything.
pub struct StubEngine {
    mode: StubMode,
    calls: AtomicUsize,
}

impl StubEngine {
    pub fn new(mode: StubMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn check_resources(&self) -> Result<(), SynthesisError> {
        match self.mode {
            StubMode::Missing => Err(SynthesisError::ResourceMissing(
                "engine binary missing: /stub/piper".into(),
            )),
            _ => Ok(()),
        }
    }

    async fn self_test(&self) -> Result<String, SynthesisError> {
        match self.mode {
            StubMode::Failing => Err(SynthesisError::EngineError(
                "engine self-test failed: stub broken".into(),
            )),
            _ => Ok("stub 0.1".into()),
        }
    }

    async fn synthesize(
        &self,
        _text: &str,
        _speaker_id: u32,
        output: &Path,
    ) -> Result<(), SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            StubMode::Ok => {
                write_wav(output, 22050, 2205);
                Ok(())
            }
            StubMode::Silent => Ok(()),
            StubMode::Failing => Err(SynthesisError::EngineError(
                "engine exited with exit status: 1: stub broken".into(),
            )),
            StubMode::Missing => Err(SynthesisError::EngineError(
                "stub invoked despite missing resources".into(),
            )),
            StubMode::TimedOut => Err(SynthesisError::Timeout(Duration::from_secs(30))),
            StubMode::Hang => {
                std::fs::write(output, b"RIFF").unwrap();
                std::future::pending::<Result<(), SynthesisError>>().await
            }
        }
    }
}
