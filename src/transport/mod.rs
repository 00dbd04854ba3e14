//! The `transport` module adapts broker client libraries to the small
//! surface the dataplane needs: connect, subscribe, publish, disconnect, and
//! a stream of incoming deliveries.
//!
//! Two adapters exist. `mqtt` talks to a real MQTT broker through `rumqttc`.
//! `memory` is an in-process network of brokers used by the tests and the
//! local demos; it routes by topic exactly like the external broker.

pub mod memory;
pub mod mqtt;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::utils::Result;

pub use memory::{MemoryBroker, MemoryClient, MemoryNetwork};
pub use mqtt::{MqttClient, MqttConnector};

/// Keepalive for connections to a remote broker.
pub const REMOTE_KEEPALIVE: Duration = Duration::from_secs(120);
/// Keepalive for the connection to the broker on this node.
pub const LOCAL_KEEPALIVE: Duration = Duration::from_secs(300);

/// Delivery guarantee requested from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Bytes,
}

/// A connected client and the stream of messages it receives.
///
/// The inbox closes when the connection to the broker is lost.
pub struct Connection<C> {
    pub client: C,
    pub inbox: UnboundedReceiver<Delivery>,
}

pub trait BrokerClient: Send + Sync + 'static {
    fn subscribe(&self, topic: &str, qos: QoS) -> impl Future<Output = Result<()>> + Send;

    fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QoS,
    ) -> impl Future<Output = Result<()>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens broker connections by host.
pub trait BrokerConnector: Clone + Send + Sync + 'static {
    type Client: BrokerClient;

    /// Connects to the broker at `host`. Fails with `Error::Connect` if the
    /// broker cannot be reached or refuses the session.
    fn connect(
        &self,
        host: &str,
        keepalive: Duration,
    ) -> impl Future<Output = Result<Connection<Self::Client>>> + Send;
}
