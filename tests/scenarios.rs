//! End-to-end runs of publishers and a subscriber over the in-memory broker
//! network.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use bytes::Bytes;
use continuum::app::Application;
use continuum::classify::{Classification, Classifier, ImageClassifier};
use continuum::config::{MqttSettings, PublisherSettings, RunSettings, SubscriberSettings};
use continuum::corpus::Corpus;
use continuum::frame::SENTINEL;
use continuum::publisher::Publisher;
use continuum::subscriber::Subscriber;
use continuum::transport::{BrokerClient, BrokerConnector, MemoryNetwork, QoS, REMOTE_KEEPALIVE};
use continuum::utils::Result;

const WORKER_HOST: &str = "192.168.100.2";
const WORK_TOPIC: &str = "image-classification-sub";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn corpus() -> Corpus {
    Corpus::from_items(vec![Bytes::from_static(JPEG); 60]).unwrap()
}

fn mqtt(local_ip: &str) -> MqttSettings {
    MqttSettings {
        local_ip: local_ip.to_string(),
        port: 1883,
        logs: false,
    }
}

fn publisher_settings(endpoint: &str, frequency: u64, duration_secs: u64) -> PublisherSettings {
    PublisherSettings {
        run: RunSettings {
            application: Application::ImageClassification,
            frequency,
            duration_secs,
            corpus_dir: PathBuf::from("images"),
        },
        mqtt: mqtt(endpoint),
        remote_ip: WORKER_HOST.to_string(),
        ack_timeout: Some(Duration::from_secs(60)),
    }
}

fn subscriber_settings(threads: usize, endpoints: usize, grace: Duration) -> SubscriberSettings {
    SubscriberSettings {
        application: Application::ImageClassification,
        mqtt: mqtt(WORKER_HOST),
        cpu_threads: threads,
        endpoints_expected: endpoints,
        grace,
        classify_rounds: 0,
    }
}

async fn wait_for_subscription(network: &MemoryNetwork) {
    while network.subscribers(WORKER_HOST, WORK_TOPIC) == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn one_endpoint_one_worker() {
    let network = MemoryNetwork::new();
    network.start_broker(WORKER_HOST);
    network.start_broker("192.168.100.10");

    let subscriber = Subscriber::new(
        subscriber_settings(2, 1, Duration::from_secs(10)),
        network.clone(),
    );
    let worker = tokio::spawn(subscriber.run());
    wait_for_subscription(&network).await;

    let publisher = Publisher::new(
        publisher_settings("192.168.100.10", 5, 2),
        network.clone(),
        corpus(),
    );
    let sent = publisher.run().await.unwrap();
    let processed = worker.await.unwrap().unwrap();

    assert_eq!(sent.published, 11);
    assert_eq!(sent.acked, 10);
    assert_eq!(sent.latencies.len(), 10);
    assert_eq!(processed.processed(), 10);
    assert_eq!(processed.metrics.acks_sent, 10);
    assert_eq!(processed.metrics.sentinels, 1);
}

#[tokio::test(start_paused = true)]
async fn two_endpoints_one_worker() {
    let network = MemoryNetwork::new();
    network.start_broker(WORKER_HOST);
    network.start_broker("192.168.100.10");
    network.start_broker("192.168.100.11");

    let subscriber = Subscriber::new(
        subscriber_settings(1, 2, Duration::from_secs(10)),
        network.clone(),
    );
    let worker = tokio::spawn(subscriber.run());
    wait_for_subscription(&network).await;

    let first = Publisher::new(
        publisher_settings("192.168.100.10", 2, 1),
        network.clone(),
        corpus(),
    );
    let second = Publisher::new(
        publisher_settings("192.168.100.11", 2, 1),
        network.clone(),
        corpus(),
    );
    let (first, second) = tokio::join!(first.run(), second.run());
    let processed = worker.await.unwrap().unwrap();

    assert_eq!(first.unwrap().acked, 2);
    assert_eq!(second.unwrap().acked, 2);
    assert_eq!(processed.processed(), 4);
    assert_eq!(processed.metrics.sentinels, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_is_dropped_without_ack() {
    let network = MemoryNetwork::new();
    network.start_broker(WORKER_HOST);
    network.start_broker("192.168.100.10");

    let subscriber = Subscriber::new(
        subscriber_settings(2, 1, Duration::from_secs(10)),
        network.clone(),
    );
    let worker = tokio::spawn(subscriber.run());
    wait_for_subscription(&network).await;

    let intruder = network.connect(WORKER_HOST, REMOTE_KEEPALIVE).await.unwrap();
    intruder
        .client
        .publish(WORK_TOPIC, Bytes::from_static(b"0123456789"), QoS::AtMostOnce)
        .await
        .unwrap();

    let publisher = Publisher::new(
        publisher_settings("192.168.100.10", 5, 2),
        network.clone(),
        corpus(),
    );
    let sent = publisher.run().await.unwrap();
    let processed = worker.await.unwrap().unwrap();

    assert_eq!(sent.acked, 10);
    assert_eq!(processed.processed(), 10);
    assert_eq!(processed.metrics.decode_errors, 1);
    assert_eq!(processed.metrics.acks_sent, 10);
    assert_eq!(processed.metrics.dequeued, 12);
}

#[tokio::test(start_paused = true)]
async fn extra_sentinels_are_ignored() {
    let network = MemoryNetwork::new();
    network.start_broker(WORKER_HOST);

    let subscriber = Subscriber::new(
        subscriber_settings(1, 1, Duration::from_secs(10)),
        network.clone(),
    );
    let worker = tokio::spawn(subscriber.run());
    wait_for_subscription(&network).await;

    let sender = network.connect(WORKER_HOST, REMOTE_KEEPALIVE).await.unwrap();
    for _ in 0..3 {
        sender
            .client
            .publish(WORK_TOPIC, Bytes::from_static(SENTINEL), QoS::ExactlyOnce)
            .await
            .unwrap();
    }

    let processed = worker.await.unwrap().unwrap();
    assert_eq!(processed.metrics.sentinels, 3);
    assert_eq!(processed.processed(), 0);
}

/// Classifier that holds every call until the gate opens.
struct Gate {
    inner: ImageClassifier,
    entered: AtomicUsize,
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            inner: ImageClassifier::new(0, 1),
            entered: AtomicUsize::new(0),
            open: Mutex::new(false),
            opened: Condvar::new(),
        }
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl Classifier for Gate {
    fn classify(&self, payload: &[u8]) -> Result<Classification> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        self.inner.classify(payload)
    }
}

#[tokio::test]
async fn unreachable_reply_broker_drops_acks() {
    const ENDPOINT: &str = "192.168.100.10";
    let network = MemoryNetwork::new();
    network.start_broker(WORKER_HOST);
    network.start_broker(ENDPOINT);

    let gate = Arc::new(Gate::new());
    let subscriber = Subscriber::new(
        subscriber_settings(1, 1, Duration::from_millis(200)),
        network.clone(),
    )
    .with_classifier(gate.clone());
    let worker = tokio::spawn(subscriber.run());
    wait_for_subscription(&network).await;

    let publisher = Publisher::new(publisher_settings(ENDPOINT, 4, 1), network.clone(), corpus());
    let publishing = tokio::spawn(publisher.run());

    while gate.entered.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    network.shutdown_host(ENDPOINT);
    gate.release();

    let sent = publishing.await.unwrap().unwrap();
    let processed = worker.await.unwrap().unwrap();

    assert_eq!(sent.published, 5);
    assert_eq!(sent.acked, 0);
    assert!(!sent.all_acked());
    assert_eq!(processed.processed(), 4);
    assert_eq!(processed.metrics.acks_sent, 0);
    assert_eq!(processed.metrics.sentinels, 1);
}
