//! In-process broker network.
//!
//! Each host name maps to one `MemoryBroker`. Clients connect by host name,
//! subscribe by exact topic and receive deliveries on an unbounded channel,
//! which mirrors what the MQTT adapter hands to the rest of the crate.
//! Taking a host down drops its broker, which closes every inbox attached to
//! it and makes further publishes through its clients fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BrokerClient, BrokerConnector, Connection, Delivery, QoS};
use crate::utils::{Error, Result};

type ClientId = String;

#[derive(Debug)]
struct Session {
    id: ClientId,
    sender: UnboundedSender<Delivery>,
}

/// Topic routing table for one host.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    /// Topic name to the ids of its subscribers.
    topics: HashMap<String, HashSet<ClientId>>,
    clients: HashMap<ClientId, Session>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&mut self, id: ClientId, sender: UnboundedSender<Delivery>) {
        self.clients.insert(id.clone(), Session { id, sender });
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, HashSet::len)
    }

    /// Subscribes a client to a topic, creating the topic on first use.
    /// Subscribing twice has no effect.
    pub fn subscribe(&mut self, topic: &str, subscriber: ClientId) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(subscriber);
    }

    /// Hands the delivery to every subscriber of its topic and returns how
    /// many received it. Publishing to a topic nobody subscribed to drops
    /// the message.
    pub fn publish(&self, delivery: Delivery) -> usize {
        let Some(subscribers) = self.topics.get(&delivery.topic) else {
            debug!("No subscribers on '{}', message dropped", delivery.topic);
            return 0;
        };

        let mut delivered = 0;
        for sub_id in subscribers {
            match self.clients.get(sub_id) {
                Some(session) if session.sender.send(delivery.clone()).is_ok() => delivered += 1,
                Some(session) => debug!("Inbox of {} is closed", session.id),
                None => debug!("No client registered with id: {sub_id}"),
            }
        }
        delivered
    }

    /// Removes a client and all of its subscriptions. Dropping the session
    /// closes the client's inbox.
    pub fn cleanup_client(&mut self, client_id: &str) {
        self.clients.remove(client_id);
        for subscribers in self.topics.values_mut() {
            subscribers.remove(client_id);
        }
        debug!("Cleaned up client {client_id}");
    }
}

type SharedBroker = Arc<Mutex<MemoryBroker>>;

/// A set of named hosts, each running one broker. Cloning shares the network.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    hosts: Arc<Mutex<HashMap<String, SharedBroker>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a broker on `host`. A host that is already up keeps its broker.
    pub fn start_broker(&self, host: &str) {
        self.hosts
            .lock()
            .expect("memory network lock poisoned")
            .entry(host.to_string())
            .or_default();
    }

    /// Takes the broker on `host` down, closing every connection to it.
    pub fn shutdown_host(&self, host: &str) {
        let removed = self
            .hosts
            .lock()
            .expect("memory network lock poisoned")
            .remove(host);
        if removed.is_some() {
            info!("Broker at {host} shut down");
        }
    }

    pub fn is_up(&self, host: &str) -> bool {
        self.broker(host).is_some()
    }

    /// Number of clients currently connected to `host`.
    pub fn connections(&self, host: &str) -> usize {
        self.broker(host)
            .map(|b| b.lock().expect("memory broker lock poisoned").client_count())
            .unwrap_or(0)
    }

    /// Number of clients on `host` subscribed to `topic`.
    pub fn subscribers(&self, host: &str, topic: &str) -> usize {
        self.broker(host)
            .map(|b| {
                b.lock()
                    .expect("memory broker lock poisoned")
                    .subscriber_count(topic)
            })
            .unwrap_or(0)
    }

    fn broker(&self, host: &str) -> Option<SharedBroker> {
        self.hosts
            .lock()
            .expect("memory network lock poisoned")
            .get(host)
            .cloned()
    }
}

impl BrokerConnector for MemoryNetwork {
    type Client = MemoryClient;

    async fn connect(&self, host: &str, _keepalive: Duration) -> Result<Connection<MemoryClient>> {
        let broker = self
            .broker(host)
            .ok_or_else(|| Error::connect(host, "connection refused"))?;

        let id = Uuid::new_v4().to_string();
        let (tx, inbox) = mpsc::unbounded_channel();
        broker
            .lock()
            .expect("memory broker lock poisoned")
            .register_client(id.clone(), tx);
        debug!("Client {id} connected to {host}");

        Ok(Connection {
            client: MemoryClient {
                id,
                host: host.to_string(),
                broker: Arc::downgrade(&broker),
            },
            inbox,
        })
    }
}

/// Client handle onto a `MemoryBroker`. QoS levels are accepted but every
/// delivery is immediate and in order.
#[derive(Debug, Clone)]
pub struct MemoryClient {
    id: ClientId,
    host: String,
    broker: Weak<Mutex<MemoryBroker>>,
}

impl MemoryClient {
    fn with_broker<T>(&self, f: impl FnOnce(&mut MemoryBroker) -> Result<T>) -> Result<T> {
        let broker = self
            .broker
            .upgrade()
            .ok_or_else(|| Error::Broker(format!("broker at {} is down", self.host)))?;
        let mut guard = broker.lock().expect("memory broker lock poisoned");
        if !guard.is_registered(&self.id) {
            return Err(Error::Broker(format!(
                "client {} is not connected to {}",
                self.id, self.host
            )));
        }
        f(&mut guard)
    }
}

impl BrokerClient for MemoryClient {
    async fn subscribe(&self, topic: &str, _qos: QoS) -> Result<()> {
        self.with_broker(|broker| {
            broker.subscribe(topic, self.id.clone());
            Ok(())
        })
    }

    async fn publish(&self, topic: &str, payload: Bytes, _qos: QoS) -> Result<()> {
        self.with_broker(|broker| {
            broker.publish(Delivery {
                topic: topic.to_string(),
                payload,
            });
            Ok(())
        })
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(broker) = self.broker.upgrade() else {
            return Ok(());
        };
        broker
            .lock()
            .expect("memory broker lock poisoned")
            .cleanup_client(&self.id);
        Ok(())
    }
}
