//! The endpoint publisher.
//!
//! Sends `F·D` framed items from the local corpus to the work topic on the
//! remote broker at a fixed rate, then a sentinel with QoS 2. Acks come back
//! on the ack topic of the broker on this node, which is subscribed to before
//! the first frame goes out. Each ack yields one latency record.

mod acks;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::Application;
use crate::config::PublisherSettings;
use crate::corpus::Corpus;
use crate::frame::{self, SENTINEL};
use crate::metrics::{Metrics, report};
use crate::pacing::Pacer;
use crate::transport::{BrokerClient, BrokerConnector, LOCAL_KEEPALIVE, QoS, REMOTE_KEEPALIVE};
use crate::utils::Result;

/// Outcome of a publisher run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherReport {
    pub application: Application,
    /// Work messages the run was configured to send.
    pub max_msgs: u64,
    /// Messages accepted by the remote broker, sentinel included.
    pub published: u64,
    pub acked: u64,
    pub overruns: u64,
    /// End-to-end latency of every ack, in arrival order.
    pub latencies: Vec<u64>,
}

impl PublisherReport {
    pub fn all_acked(&self) -> bool {
        self.acked >= self.max_msgs
    }
}

pub struct Publisher<C: BrokerConnector> {
    settings: PublisherSettings,
    connector: C,
    corpus: Corpus,
}

impl<C: BrokerConnector> Publisher<C> {
    pub fn new(settings: PublisherSettings, connector: C, corpus: Corpus) -> Self {
        Self {
            settings,
            connector,
            corpus,
        }
    }

    pub async fn run(self) -> Result<PublisherReport> {
        let run = &self.settings.run;
        let application = run.application;
        let local_ip = self.settings.mqtt.local_ip.as_str();
        let remote_ip = self.settings.remote_ip.as_str();
        let max_msgs = run.max_msgs();
        let metrics = Arc::new(Metrics::new());

        info!(
            "Start connecting to the local broker at {local_ip}, topic {}",
            application.ack_topic()
        );
        let local = self.connector.connect(local_ip, LOCAL_KEEPALIVE).await?;
        local
            .client
            .subscribe(application.ack_topic(), QoS::AtMostOnce)
            .await?;

        let (acked_tx, mut acked_rx) = watch::channel(0);
        let listener = tokio::spawn(acks::listen(
            local.inbox,
            application.ack_topic(),
            metrics.clone(),
            acked_tx,
        ));

        info!(
            "Start connecting to the remote broker at {remote_ip}, topic {}",
            application.work_topic()
        );
        let remote = self.connector.connect(remote_ip, REMOTE_KEEPALIVE).await?;

        let pacer = Pacer::new(run.period());
        for i in 0..max_msgs {
            let start = Instant::now();
            let payload = self.corpus.get(i);
            let bytes = frame::encode(&payload, frame::now_ns(), local_ip)?;

            debug!("Sending data (bytes): {}", bytes.len());
            match remote
                .client
                .publish(application.work_topic(), Bytes::from(bytes), QoS::AtMostOnce)
                .await
            {
                Ok(()) => {
                    metrics.record_published();
                }
                Err(e) => warn!("Failed to publish item {i}: {e}"),
            }
            debug!(
                "Preparation and preprocessing (ns): {}",
                start.elapsed().as_nanos()
            );

            if pacer.wait_for_deadline(start).await.is_overrun() {
                metrics.record_overrun();
            }
        }

        match remote
            .client
            .publish(
                application.work_topic(),
                Bytes::from_static(SENTINEL),
                QoS::ExactlyOnce,
            )
            .await
        {
            Ok(()) => {
                metrics.record_published();
            }
            Err(e) => error!("Failed to send the end-of-stream message: {e}"),
        }
        if let Err(e) = remote.client.disconnect().await {
            warn!("Remote disconnect failed: {e}");
        }
        report::sent(application.noun(), max_msgs);

        info!("Wait for all {} to be received back", application.noun());
        if acks::wait_for(&mut acked_rx, max_msgs, self.settings.ack_timeout).await {
            info!(
                "All {max_msgs} {} have been received back",
                application.noun()
            );
        }

        if let Err(e) = local.client.disconnect().await {
            debug!("Local disconnect failed: {e}");
        }
        let latencies = listener.await.unwrap_or_else(|e| {
            error!("Ack listener failed: {e}");
            Vec::new()
        });

        let snapshot = metrics.snapshot();
        Ok(PublisherReport {
            application,
            max_msgs,
            published: snapshot.published,
            acked: snapshot.acked,
            overruns: snapshot.overruns,
            latencies,
        })
    }
}
