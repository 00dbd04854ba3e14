use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{FUNCTION_PATH, FunctionRequest, parse_response};
use crate::config::ServerlessPublisherSettings;
use crate::corpus::Corpus;
use crate::frame;
use crate::metrics::{Metrics, report};
use crate::pacing::Pacer;
use crate::publisher::PublisherReport;
use crate::utils::Result;

/// Function invocations can queue behind cold starts; only give up on a
/// request that is clearly lost.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(100_000);

/// Publisher that invokes the function over HTTP and takes each response as
/// the ack for its item.
pub struct ServerlessPublisher {
    settings: ServerlessPublisherSettings,
    corpus: Corpus,
    client: reqwest::Client,
    url: String,
}

impl ServerlessPublisher {
    pub fn new(settings: ServerlessPublisherSettings, corpus: Corpus) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let url = format!(
            "http://{}:{}{FUNCTION_PATH}",
            settings.controller_ip, settings.port
        );
        Ok(Self {
            settings,
            corpus,
            client,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends every item and waits for each response in turn. An unreadable
    /// response aborts the run; a failed request is logged and skipped.
    pub async fn run(self) -> Result<PublisherReport> {
        let run = &self.settings.run;
        let max_msgs = run.max_msgs();
        let metrics = Metrics::new();
        let pacer = Pacer::new(run.period());
        let mut latencies = Vec::new();

        info!("Invoking {} {} times", self.url, max_msgs);
        for i in 0..max_msgs {
            let start = Instant::now();
            let request = FunctionRequest {
                image: BASE64.encode(self.corpus.get(i)),
                time: frame::now_ns().to_string(),
            };
            let body = serde_json::to_vec(&request)?;
            debug!("Sending data (bytes): {}", body.len());
            debug!(
                "Preparation and preprocessing (ns): {}",
                start.elapsed().as_nanos()
            );

            match self.invoke(body).await {
                Ok(text) => {
                    let origin_ns = parse_response(&text)?;
                    let latency = frame::now_ns().saturating_sub(origin_ns);
                    report::latency(latency);
                    latencies.push(latency);
                    metrics.record_published();
                    metrics.record_acked();
                }
                Err(e) => warn!("Request {i} to {} failed: {e}", self.url),
            }

            if pacer.wait_for_deadline(start).await.is_overrun() {
                metrics.record_overrun();
            }
        }
        report::sent(run.application.noun(), max_msgs);

        let snapshot = metrics.snapshot();
        Ok(PublisherReport {
            application: run.application,
            max_msgs,
            published: snapshot.published,
            acked: snapshot.acked,
            overruns: snapshot.overruns,
            latencies,
        })
    }

    async fn invoke(&self, body: Vec<u8>) -> reqwest::Result<String> {
        self.client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/plain")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
