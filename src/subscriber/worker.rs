use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::queue::WorkItem;
use super::reply::ReplyTable;
use super::Shared;
use crate::frame::{self, Decoded};
use crate::metrics::report;
use crate::transport::{BrokerClient, BrokerConnector, QoS};

/// One member of the worker pool: drains the shared queue, classifies each
/// frame and acks it to the sender's broker.
pub(crate) struct Worker<C: BrokerConnector> {
    name: String,
    shared: Arc<Shared>,
    replies: ReplyTable<C>,
}

/// A decoded frame with its parts detached from the received buffer.
struct Job {
    payload: Bytes,
    timestamp_field: Bytes,
    origin_ns: u64,
    reply_to: String,
}

impl<C: BrokerConnector> Worker<C> {
    pub(crate) fn new(index: usize, shared: Arc<Shared>, connector: C) -> Self {
        Self {
            name: format!("worker-{index}"),
            shared,
            replies: ReplyTable::new(connector),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("[{}] Start", self.name);
        while let Some(item) = self.shared.queue.pop().await {
            self.shared.metrics.record_dequeued();
            self.handle(item).await;
        }
        debug!(
            "[{}] Queue closed, disconnecting {} reply clients",
            self.name,
            self.replies.len()
        );
        self.replies.close().await;
    }

    async fn handle(&mut self, item: WorkItem) {
        let started = Instant::now();

        let job = match frame::decode(&item.bytes) {
            Ok(Decoded::Sentinel) => {
                self.on_sentinel();
                return;
            }
            Ok(Decoded::Work(work)) => Job {
                payload: item.bytes.slice_ref(work.payload),
                timestamp_field: item.bytes.slice_ref(work.timestamp_field),
                origin_ns: work.origin_ns,
                reply_to: work.reply_to.to_string(),
            },
            Err(e) => {
                self.shared.metrics.record_decode_error();
                warn!("[{}] Dropped malformed frame: {e}", self.name);
                return;
            }
        };

        debug!(
            "[{}] One-way latency (ns): {}",
            self.name,
            item.arrival_ns.saturating_sub(job.origin_ns)
        );

        let classifier = self.shared.classifier.clone();
        let payload = job.payload.clone();
        let classification =
            match tokio::task::spawn_blocking(move || classifier.classify(&payload)).await {
                Ok(Ok(classification)) => classification,
                Ok(Err(e)) => {
                    self.shared.metrics.record_classify_error();
                    warn!("[{}] {e}", self.name);
                    return;
                }
                Err(e) => {
                    self.shared.metrics.record_classify_error();
                    warn!("[{}] Classifier task failed: {e}", self.name);
                    return;
                }
            };
        debug!("[{}] Labels: {:?}", self.name, classification.labels);

        report::processing(started.elapsed());
        self.shared.metrics.record_processed();

        let result = if self.shared.application.acks_carry_result() {
            classification.text.as_deref().map(str::as_bytes)
        } else {
            None
        };
        let ack = frame::encode_ack(result, &job.timestamp_field);
        self.send_ack(&job.reply_to, ack).await;
    }

    fn on_sentinel(&self) {
        self.shared.metrics.record_sentinel();
        match self.shared.endpoints.sentinel_received() {
            Some(left) => info!("[{}] A client disconnected, {left} clients left", self.name),
            None => warn!("[{}] Ignoring sentinel from an unexpected endpoint", self.name),
        }
    }

    async fn send_ack(&mut self, reply_to: &str, ack: Vec<u8>) {
        let topic = self.shared.application.ack_topic();
        let client = match self.replies.client_for(reply_to).await {
            Ok(client) => client,
            Err(e) => {
                warn!("[{}] Dropping ack for {reply_to}: {e}", self.name);
                return;
            }
        };

        match client.publish(topic, Bytes::from(ack), QoS::AtMostOnce).await {
            Ok(()) => {
                self.shared.metrics.record_ack_sent();
                debug!("[{}] Sent result to source: {reply_to}", self.name);
            }
            Err(e) => warn!("[{}] Failed to send ack to {reply_to}: {e}", self.name),
        }
    }
}
