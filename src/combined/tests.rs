use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use super::*;
use crate::classify::Classification;
use crate::config::RunSettings;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn settings(application: Application, frequency: u64, duration_secs: u64) -> CombinedSettings {
    CombinedSettings {
        run: RunSettings {
            application,
            frequency,
            duration_secs,
            corpus_dir: PathBuf::from("images"),
        },
        cpu_threads: 1,
        classify_rounds: 0,
    }
}

fn image_corpus(n: usize) -> Corpus {
    Corpus::from_items((0..n).map(|_| Bytes::from_static(JPEG)).collect()).unwrap()
}

struct RejectEveryOther;

impl Classifier for RejectEveryOther {
    fn classify(&self, payload: &[u8]) -> Result<Classification> {
        if payload.first() == Some(&b'x') {
            Err(Error::Classify("rejected".to_string()))
        } else {
            Ok(Classification::default())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_process_loop_processes_every_item() {
    let combined = Combined::new(settings(Application::ImageClassification, 10, 1), image_corpus(60));
    let report = combined.run().await.unwrap();

    assert_eq!(report.max_msgs, 10);
    assert_eq!(report.processed, 10);
    assert_eq!(report.latencies.len(), 10);
    assert_eq!(report.overruns, 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_takes_about_the_configured_duration() {
    let start = Instant::now();
    let combined = Combined::new(settings(Application::ImageClassification, 5, 2), image_corpus(3));
    let report = combined.run().await.unwrap();

    assert_eq!(report.processed, 10);
    assert!(start.elapsed() >= std::time::Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_classify_errors_are_skipped() {
    let corpus = Corpus::from_items(vec![Bytes::from_static(b"ok"), Bytes::from_static(b"xx")]).unwrap();
    let combined = Combined::new(settings(Application::TextTranslation, 4, 1), corpus)
        .with_classifier(Arc::new(RejectEveryOther));
    let report = combined.run().await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.latencies.len(), 2);
}
