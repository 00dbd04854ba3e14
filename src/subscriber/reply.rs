use std::collections::HashMap;

use tracing::{info, warn};

use crate::transport::{BrokerClient, BrokerConnector, REMOTE_KEEPALIVE};
use crate::utils::Result;

/// Broker clients for sending acks, keyed by reply address.
///
/// Owned by a single worker. A client is created the first time an address
/// is seen and kept until the worker stops. Failed connects are not
/// remembered, so the next message for that address tries again.
pub struct ReplyTable<C: BrokerConnector> {
    connector: C,
    clients: HashMap<String, C::Client>,
}

impl<C: BrokerConnector> ReplyTable<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            clients: HashMap::new(),
        }
    }

    pub async fn client_for(&mut self, address: &str) -> Result<&C::Client> {
        if !self.clients.contains_key(address) {
            info!("Connect to remote broker on endpoint {address}");
            let connection = self.connector.connect(address, REMOTE_KEEPALIVE).await?;
            self.clients.insert(address.to_string(), connection.client);
        }
        Ok(&self.clients[address])
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Disconnects every client.
    pub async fn close(self) {
        for (address, client) in self.clients {
            if let Err(e) = client.disconnect().await {
                warn!("Failed to disconnect from {address}: {e}");
            }
        }
    }
}
