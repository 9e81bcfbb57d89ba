use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub piper_bin: PathBuf,
    pub piper_model: PathBuf,
    pub output_dir: PathBuf,
    pub synth_timeout: Duration,
    pub self_test_timeout: Duration,
    pub max_text_chars: usize,
    /// Forward `speaker_id` to Piper as `--speaker`. Single-speaker builds
    /// leave this off and the request field is accepted but unused.
    pub speaker_arg: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            piper_bin: PathBuf::from("/app/piper/bin/piper"),
            piper_model: PathBuf::from("/app/models/en_US-kathleen-low.onnx"),
            output_dir: PathBuf::from("/app/output"),
            synth_timeout: Duration::from_secs(30),
            self_test_timeout: Duration::from_secs(5),
            max_text_chars: 10_000,
            speaker_arg: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            piper_bin: lookup("PIPER_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.piper_bin),
            piper_model: lookup("PIPER_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.piper_model),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            synth_timeout: Duration::from_secs(parse_var(
                &lookup,
                "SYNTH_TIMEOUT_SECS",
                defaults.synth_timeout.as_secs(),
            )?),
            self_test_timeout: Duration::from_secs(parse_var(
                &lookup,
                "SELF_TEST_TIMEOUT_SECS",
                defaults.self_test_timeout.as_secs(),
            )?),
            max_text_chars: parse_var(&lookup, "MAX_TEXT_CHARS", defaults.max_text_chars)?,
            speaker_arg: match lookup("PIPER_SPEAKER_ARG") {
                Some(v) => parse_flag("PIPER_SPEAKER_ARG", &v)?,
                None => defaults.speaker_arg,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
        None => Ok(default),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
