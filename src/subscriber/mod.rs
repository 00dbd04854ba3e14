//! The worker subscriber.
//!
//! A subscriber listens on the work topic of the broker on its own node.
//! An intake task moves every delivery onto the shared `WorkQueue` stamped
//! with its arrival time, and `N` workers drain that queue: each decodes the
//! frame, runs the classifier and publishes an ack to the sender's broker
//! through its own `ReplyTable`.
//!
//! Shutdown is driven by a supervisor that polls once a second. When every
//! expected endpoint has sent its sentinel and the queue is empty, the
//! subscriber waits out a grace period for in-flight acks, then disconnects,
//! closes the queue and joins the workers. Losing the local broker while
//! running is fatal.

mod counter;
mod lifecycle;
mod queue;
mod reply;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::app::Application;
use crate::classify::{self, Classifier};
use crate::config::SubscriberSettings;
use crate::frame;
use crate::metrics::{Metrics, MetricsSnapshot, report};
use crate::transport::{BrokerClient, BrokerConnector, Delivery, LOCAL_KEEPALIVE, QoS};
use crate::utils::{Error, Result};

pub use counter::EndpointCounter;
pub use lifecycle::{Lifecycle, Phase};
pub use queue::{WorkItem, WorkQueue};
pub use reply::ReplyTable;

use worker::Worker;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State shared by the intake task, the workers and the supervisor.
pub(crate) struct Shared {
    pub(crate) application: Application,
    pub(crate) queue: WorkQueue,
    pub(crate) endpoints: EndpointCounter,
    pub(crate) metrics: Metrics,
    pub(crate) classifier: Arc<dyn Classifier>,
}

/// Outcome of a completed subscriber run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberReport {
    pub application: Application,
    pub metrics: MetricsSnapshot,
}

impl SubscriberReport {
    pub fn processed(&self) -> u64 {
        self.metrics.processed
    }
}

pub struct Subscriber<C: BrokerConnector> {
    settings: SubscriberSettings,
    connector: C,
    classifier: Arc<dyn Classifier>,
}

impl<C: BrokerConnector> Subscriber<C> {
    pub fn new(settings: SubscriberSettings, connector: C) -> Self {
        let classifier =
            classify::for_application(settings.application, settings.classify_rounds, 1);
        Self {
            settings,
            connector,
            classifier,
        }
    }

    /// Replaces the classifier built from the settings.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub async fn run(self) -> Result<SubscriberReport> {
        let application = self.settings.application;
        let local_ip = self.settings.mqtt.local_ip.as_str();
        let work_topic = application.work_topic();

        info!("Start connecting to the local broker at {local_ip}, topic {work_topic}");
        let connection = self.connector.connect(local_ip, LOCAL_KEEPALIVE).await?;
        let local = connection.client;
        local.subscribe(work_topic, QoS::ExactlyOnce).await?;
        info!("Subscribed to topic {work_topic}");

        let shared = Arc::new(Shared {
            application,
            queue: WorkQueue::new(),
            endpoints: EndpointCounter::new(self.settings.endpoints_expected),
            metrics: Metrics::new(),
            classifier: self.classifier,
        });

        let workers: Vec<JoinHandle<()>> = (0..self.settings.cpu_threads)
            .map(|i| tokio::spawn(Worker::new(i, shared.clone(), self.connector.clone()).run()))
            .collect();
        let mut intake = tokio::spawn(intake(connection.inbox, shared.clone(), work_topic));

        let mut lifecycle = Lifecycle::new(self.settings.grace);
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let before = lifecycle.phase();
                    let phase = lifecycle.observe(
                        shared.endpoints.remaining(),
                        shared.queue.is_empty(),
                        Instant::now(),
                    );
                    if phase != before {
                        info!("Subscriber {before:?} -> {phase:?}");
                    }
                    if phase == Phase::Stopped {
                        break;
                    }
                }
                _ = &mut intake => {
                    error!("Lost the connection to the local broker at {local_ip}");
                    shared.queue.close();
                    return Err(Error::Broker(format!(
                        "connection to local broker {local_ip} closed while running"
                    )));
                }
            }
        }

        if let Err(e) = local.disconnect().await {
            debug!("Local disconnect failed: {e}");
        }
        intake.abort();
        shared.queue.close();
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Worker task failed: {e}");
            }
        }

        let metrics = shared.metrics.snapshot();
        report::processed(application.noun(), metrics.processed);
        Ok(SubscriberReport {
            application,
            metrics,
        })
    }
}

/// Moves deliveries from the broker onto the work queue until the inbox
/// closes.
async fn intake(
    mut inbox: UnboundedReceiver<Delivery>,
    shared: Arc<Shared>,
    work_topic: &'static str,
) {
    while let Some(delivery) = inbox.recv().await {
        if delivery.topic != work_topic {
            debug!("Ignoring message on unexpected topic {}", delivery.topic);
            continue;
        }
        let item = WorkItem {
            arrival_ns: frame::now_ns(),
            bytes: delivery.payload,
        };
        if !shared.queue.push(item) {
            break;
        }
    }
}
