use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

const SEQUENCE_SPAN: u64 = 1_000_000;

/// Hands out artifact file names of the form
/// `speech_20261016_142501_042_000017.wav`.
///
/// The UTC timestamp orders names across seconds and the zero-padded counter
/// orders (and disambiguates) names generated within the same millisecond.
#[derive(Debug)]
pub struct ArtifactNamer {
    prefix: String,
    sequence: AtomicU64,
}

impl Default for ArtifactNamer {
    fn default() -> Self {
        Self::new("speech")
    }
}

impl ArtifactNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: sanitize(&prefix.into()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_name(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) % SEQUENCE_SPAN;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        format!("{}_{}_{:06}.wav", self.prefix, timestamp, seq)
    }
}

fn sanitize(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "speech".to_string()
    } else {
        cleaned
    }
}
