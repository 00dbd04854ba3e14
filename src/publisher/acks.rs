use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::frame;
use crate::metrics::{Metrics, report};
use crate::transport::Delivery;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Consumes acks from the local broker until the inbox closes.
///
/// Prints one latency record per ack, publishes the running ack count on
/// `acked` and returns every latency observed.
pub(crate) async fn listen(
    mut inbox: UnboundedReceiver<Delivery>,
    ack_topic: &'static str,
    metrics: Arc<Metrics>,
    acked: watch::Sender<u64>,
) -> Vec<u64> {
    let mut latencies = Vec::new();
    while let Some(delivery) = inbox.recv().await {
        let now = frame::now_ns();
        if delivery.topic != ack_topic {
            continue;
        }
        match frame::decode_ack(&delivery.payload) {
            Ok(origin_ns) => {
                let latency = now.saturating_sub(origin_ns);
                report::latency(latency);
                latencies.push(latency);
                acked.send_replace(metrics.record_acked());
            }
            Err(e) => warn!("Dropped malformed ack: {e}"),
        }
    }
    latencies
}

/// Waits until `expected` acks have arrived, logging progress every ten
/// seconds. Returns `false` if `limit` passed first or the ack stream ended
/// early.
pub(crate) async fn wait_for(
    acked: &mut watch::Receiver<u64>,
    expected: u64,
    limit: Option<Duration>,
) -> bool {
    let wait = async {
        let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
        loop {
            let current = *acked.borrow_and_update();
            if current >= expected {
                return true;
            }
            tokio::select! {
                _ = progress.tick() => info!("Waiting progress: {current} / {expected}"),
                changed = acked.changed() => {
                    if changed.is_err() {
                        warn!("Ack stream closed with {current} / {expected} received");
                        return *acked.borrow() >= expected;
                    }
                }
            }
        }
    };

    match limit {
        Some(limit) => tokio::time::timeout(limit, wait).await.unwrap_or_else(|_| {
            warn!("Gave up waiting for acks after {}s", limit.as_secs());
            false
        }),
        None => wait.await,
    }
}
