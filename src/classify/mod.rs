//! The inference step, treated as an opaque `classify(bytes) -> labels`.
//!
//! The dataplane only measures how long a call takes. The synthetic
//! implementations here validate the payload the way a real model front-end
//! would, then spend a configurable amount of CPU so the benchmark can model
//! heavier or lighter workloads.

use std::sync::Arc;

use crate::app::Application;
use crate::utils::{Error, Result};

/// Result of one classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub labels: Vec<String>,
    /// Result text sent back in the ack (translation only).
    pub text: Option<String>,
}

/// CPU-bound, called from a blocking thread, one call per message.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, payload: &[u8]) -> Result<Classification>;
}

/// Builds the classifier for `application`.
///
/// `rounds` is the synthetic work per call and `threads` the number of
/// threads a single call may use.
pub fn for_application(application: Application, rounds: u64, threads: usize) -> Arc<dyn Classifier> {
    match application {
        Application::ImageClassification => Arc::new(ImageClassifier::new(rounds, threads)),
        Application::TextTranslation => Arc::new(TextTranslator::new(rounds, threads)),
    }
}

#[derive(Debug, Clone)]
pub struct ImageClassifier {
    rounds: u64,
    threads: usize,
}

impl ImageClassifier {
    pub fn new(rounds: u64, threads: usize) -> Self {
        Self {
            rounds,
            threads: threads.max(1),
        }
    }
}

impl Classifier for ImageClassifier {
    fn classify(&self, payload: &[u8]) -> Result<Classification> {
        let format = image_format(payload)
            .ok_or_else(|| Error::Classify("unrecognised image format".to_string()))?;
        let digest = burn(payload, self.rounds, self.threads);

        Ok(Classification {
            labels: vec![format.to_string(), format!("{digest:016x}")],
            text: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TextTranslator {
    rounds: u64,
    threads: usize,
}

impl TextTranslator {
    pub fn new(rounds: u64, threads: usize) -> Self {
        Self {
            rounds,
            threads: threads.max(1),
        }
    }
}

impl Classifier for TextTranslator {
    fn classify(&self, payload: &[u8]) -> Result<Classification> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Classify(format!("input is not UTF-8: {e}")))?;
        burn(payload, self.rounds, self.threads);

        Ok(Classification {
            labels: Vec::new(),
            text: Some(text.trim().to_string()),
        })
    }
}

fn image_format(payload: &[u8]) -> Option<&'static str> {
    match payload {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'B', b'M', ..] => Some("bmp"),
        _ => None,
    }
}

/// Deterministic busy work: `rounds` passes of FNV-1a over `payload`,
/// split across `threads`.
pub(crate) fn burn(payload: &[u8], rounds: u64, threads: usize) -> u64 {
    let threads = threads.max(1) as u64;
    let per_thread = rounds / threads;
    let extra = rounds % threads;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let share = per_thread + u64::from(t < extra);
                scope.spawn(move || fnv_rounds(payload, share, t))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .fold(0, |acc, d| acc ^ d)
    })
}

fn fnv_rounds(payload: &[u8], rounds: u64, seed: u64) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325 ^ seed;
    for _ in 0..rounds {
        for &b in payload {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash = std::hint::black_box(hash);
    }
    hash
}
