//! MQTT adapter backed by `rumqttc`.
//!
//! `connect` drives the event loop until CONNACK so an unreachable broker is
//! reported to the caller instead of surfacing later. A background task then
//! keeps polling the event loop, forwards incoming publishes to the inbox and
//! signals QoS 2 completions. When the event loop fails the task ends and the
//! inbox closes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BrokerClient, BrokerConnector, Connection, Delivery, QoS};
use crate::utils::{Error, Result};

/// Frames carry whole images; the library default of 10 KiB is too small.
const MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;
const REQUEST_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on waiting for PUBCOMP after a QoS 2 publish.
const EXACTLY_ONCE_TIMEOUT: Duration = Duration::from_secs(30);

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MqttConnector {
    port: u16,
    log_events: bool,
}

impl MqttConnector {
    pub fn new(port: u16, log_events: bool) -> Self {
        Self { port, log_events }
    }
}

impl BrokerConnector for MqttConnector {
    type Client = MqttClient;

    async fn connect(&self, host: &str, keepalive: Duration) -> Result<Connection<MqttClient>> {
        let endpoint = format!("{host}:{}", self.port);
        let client_id = format!("continuum-{}", Uuid::new_v4());

        let mut options = MqttOptions::new(client_id, host, self.port);
        options
            .set_keep_alive(keepalive)
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        tokio::time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut eventloop, &endpoint))
            .await
            .map_err(|_| Error::connect(&endpoint, "timed out waiting for CONNACK"))??;
        info!("Connected with the broker at {endpoint}");

        let (tx, inbox) = mpsc::unbounded_channel();
        let completions = Arc::new(Notify::new());
        tokio::spawn(drive(
            eventloop,
            tx,
            completions.clone(),
            endpoint.clone(),
            self.log_events,
        ));

        Ok(Connection {
            client: MqttClient {
                client,
                completions,
                endpoint,
            },
            inbox,
        })
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop, endpoint: &str) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(Error::connect(endpoint, format!("{:?}", ack.code)))
                };
            }
            Ok(_) => continue,
            Err(e) => return Err(Error::connect(endpoint, e)),
        }
    }
}

async fn drive(
    mut eventloop: EventLoop,
    inbox: UnboundedSender<Delivery>,
    completions: Arc<Notify>,
    endpoint: String,
    log_events: bool,
) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if log_events {
                    info!("[ {endpoint} ] {event:?}");
                }
                match event {
                    Event::Incoming(Packet::Publish(publish)) => {
                        let delivery = Delivery {
                            topic: publish.topic,
                            payload: publish.payload,
                        };
                        if inbox.send(delivery).is_err() {
                            debug!("Dropped delivery from {endpoint}: nobody is reading");
                        }
                    }
                    Event::Incoming(Packet::PubComp(_)) => completions.notify_waiters(),
                    Event::Outgoing(Outgoing::Disconnect) => break,
                    _ => {}
                }
            }
            Err(e) => {
                warn!("Connection to {endpoint} closed: {e}");
                break;
            }
        }
    }
    debug!("Event loop for {endpoint} stopped");
}

#[derive(Debug, Clone)]
pub struct MqttClient {
    client: AsyncClient,
    completions: Arc<Notify>,
    endpoint: String,
}

impl MqttClient {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BrokerClient for MqttClient {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|e| Error::Broker(e.to_string()))
    }

    async fn publish(&self, topic: &str, payload: Bytes, qos: QoS) -> Result<()> {
        let completed = self.completions.notified();
        tokio::pin!(completed);
        completed.as_mut().enable();

        self.client
            .publish_bytes(topic, qos.into(), false, payload)
            .await
            .map_err(|e| Error::Broker(e.to_string()))?;

        if qos == QoS::ExactlyOnce
            && tokio::time::timeout(EXACTLY_ONCE_TIMEOUT, completed)
                .await
                .is_err()
        {
            warn!("No PUBCOMP from {} for QoS 2 publish", self.endpoint);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| Error::Broker(e.to_string()))
    }
}
