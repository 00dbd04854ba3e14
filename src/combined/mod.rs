//! Single-process baseline: the publisher's pacing loop feeds an in-process
//! queue drained by one consumer, with no network hop in between. Latency is
//! measured from when an item was generated to when its classification
//! finished.

use std::sync::Arc;
use std::time::Instant as StdInstant;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::Application;
use crate::classify::{self, Classifier};
use crate::config::CombinedSettings;
use crate::corpus::Corpus;
use crate::frame;
use crate::metrics::{Metrics, report};
use crate::pacing::Pacer;
use crate::subscriber::{WorkItem, WorkQueue};
use crate::utils::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedReport {
    pub application: Application,
    pub max_msgs: u64,
    pub processed: u64,
    pub overruns: u64,
    pub latencies: Vec<u64>,
}

pub struct Combined {
    settings: CombinedSettings,
    corpus: Corpus,
    classifier: Arc<dyn Classifier>,
}

impl Combined {
    /// The classifier may use up to `CPU_THREADS` threads per call.
    pub fn new(settings: CombinedSettings, corpus: Corpus) -> Self {
        let classifier = classify::for_application(
            settings.run.application,
            settings.classify_rounds,
            settings.cpu_threads,
        );
        Self {
            settings,
            corpus,
            classifier,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub async fn run(self) -> Result<CombinedReport> {
        let application = self.settings.run.application;
        let max_msgs = self.settings.run.max_msgs();
        let pacer = Pacer::new(self.settings.run.period());
        let queue = Arc::new(WorkQueue::new());
        let metrics = Arc::new(Metrics::new());

        let consumer = tokio::spawn(consume(
            queue.clone(),
            self.classifier,
            metrics.clone(),
        ));

        info!("Start generating {max_msgs} {}", application.noun());
        for i in 0..max_msgs {
            let start = Instant::now();
            queue.push(WorkItem {
                arrival_ns: frame::now_ns(),
                bytes: self.corpus.get(i),
            });
            metrics.record_published();

            if pacer.wait_for_deadline(start).await.is_overrun() {
                metrics.record_overrun();
            }
        }
        queue.close();

        let latencies = consumer
            .await
            .map_err(|e| Error::Classify(format!("consumer task failed: {e}")))?;
        let snapshot = metrics.snapshot();
        report::combined(application.noun(), snapshot.processed);

        Ok(CombinedReport {
            application,
            max_msgs,
            processed: snapshot.processed,
            overruns: snapshot.overruns,
            latencies,
        })
    }
}

async fn consume(
    queue: Arc<WorkQueue>,
    classifier: Arc<dyn Classifier>,
    metrics: Arc<Metrics>,
) -> Vec<u64> {
    let mut latencies = Vec::new();
    while let Some(WorkItem { arrival_ns, bytes }) = queue.pop().await {
        metrics.record_dequeued();
        let started = StdInstant::now();

        let worker = classifier.clone();
        let outcome = tokio::task::spawn_blocking(move || worker.classify(&bytes)).await;
        match outcome {
            Ok(Ok(classification)) => debug!("Labels: {:?}", classification.labels),
            Ok(Err(e)) => {
                metrics.record_classify_error();
                warn!("{e}");
                continue;
            }
            Err(e) => {
                metrics.record_classify_error();
                warn!("Classifier task failed: {e}");
                continue;
            }
        }

        report::processing(started.elapsed());
        let latency = frame::now_ns().saturating_sub(arrival_ns);
        report::latency(latency);
        latencies.push(latency);
        metrics.record_processed();
    }
    latencies
}

#[cfg(test)]
mod tests;
