//! Connection hub: the single owner of the live connection set
//!
//! Registration, unregistration and broadcast fan-out all arrive as
//! messages on bounded channels and are applied one at a time by
//! `Hub::run`. Nothing else ever touches the connection map, so the set
//! needs no lock and a connection can never be registered twice.
//!
//! Backpressure is resolved by eviction: a connection whose outbound queue
//! is full when a broadcast arrives is dropped from the set and its queue
//! closed. The evicted client is not told why; it simply sees the socket
//! close.
//!
//! `ServerState::dispatch` awaits `HubHandle::broadcast` while holding the
//! account registry's write lock. The hub loop must never take that lock,
//! or a full broadcast channel deadlocks dispatch.

use log::{debug, info, warn};
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use warp::ws::Message;

use crate::core::connection::{Connection, ConnectionId};
use crate::error::{Result, TrickleError};

/// Registry of live connections. Owned by the task running `run`.
pub struct Hub {
    connections: HashMap<ConnectionId, Connection>,
    register_rx: mpsc::Receiver<Connection>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    broadcast_rx: mpsc::Receiver<String>,
    inspect_rx: mpsc::Receiver<oneshot::Sender<Vec<ConnectionId>>>,
}

/// Cloneable front end used by every other task to reach the hub
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Connection>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    broadcast_tx: mpsc::Sender<String>,
    inspect_tx: mpsc::Sender<oneshot::Sender<Vec<ConnectionId>>>,
}

/// Create a hub and its handle. Each control channel holds `capacity`
/// pending commands.
pub fn create_hub(capacity: usize) -> (Hub, HubHandle) {
    let (register_tx, register_rx) = mpsc::channel(capacity);
    let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
    let (broadcast_tx, broadcast_rx) = mpsc::channel(capacity);
    let (inspect_tx, inspect_rx) = mpsc::channel(capacity);

    let hub = Hub {
        connections: HashMap::new(),
        register_rx,
        unregister_rx,
        broadcast_rx,
        inspect_rx,
    };
    let handle = HubHandle {
        register_tx,
        unregister_tx,
        broadcast_tx,
        inspect_tx,
    };
    (hub, handle)
}

impl Hub {
    /// Coordination loop. Runs until every `HubHandle` has been dropped.
    pub async fn run(mut self) {
        info!("Hub started");
        loop {
            tokio::select! {
                biased;

                Some(connection) = self.register_rx.recv() => self.register(connection),
                Some(id) = self.unregister_rx.recv() => {
                    self.unregister(&id);
                }
                Some(payload) = self.broadcast_rx.recv() => {
                    self.broadcast(payload);
                }
                Some(reply) = self.inspect_rx.recv() => {
                    let _ = reply.send(self.connections.keys().copied().collect());
                }
                else => break,
            }
        }
        info!("Hub stopped with {} connections still registered", self.connections.len());
    }

    fn register(&mut self, connection: Connection) {
        if self.connections.contains_key(&connection.id) {
            warn!("Connection {} is already registered", connection.id);
            return;
        }
        info!(
            "Registered connection {} for account {} ({} live)",
            connection.id,
            connection.account_id,
            self.connections.len() + 1
        );
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection and close its outbound queue. Returns whether it
    /// was registered.
    fn unregister(&mut self, id: &ConnectionId) -> bool {
        match self.connections.remove(id) {
            Some(connection) => {
                info!(
                    "Unregistered connection {} for account {} after {:?} ({} live)",
                    connection.id,
                    connection.account_id,
                    connection.connection_duration(),
                    self.connections.len()
                );
                // Dropping the connection drops the queue's only sender
                true
            }
            None => false,
        }
    }

    /// Offer `payload` to every live connection without blocking. Returns
    /// the number of queues it landed in.
    fn broadcast(&mut self, payload: String) -> usize {
        let message = Message::text(payload);
        let mut delivered = 0;
        let mut evicted = Vec::new();

        for (id, connection) in &self.connections {
            match connection.try_deliver(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Evicting slow connection {} for account {}: outbound queue full",
                        id, connection.account_id
                    );
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Connection {} write pump already gone", id);
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            self.unregister(&id);
        }

        debug!("Broadcast delivered to {} connections", delivered);
        delivered
    }
}

impl HubHandle {
    /// Add a connection to the live set
    pub async fn register(&self, connection: Connection) -> Result<()> {
        self.register_tx
            .send(connection)
            .await
            .map_err(|_| TrickleError::HubUnavailable)
    }

    /// Remove a connection and close its queue. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) -> Result<()> {
        self.unregister_tx
            .send(id)
            .await
            .map_err(|_| TrickleError::HubUnavailable)
    }

    /// Submit an encoded frame for fan-out to every live connection
    pub async fn broadcast(&self, payload: String) -> Result<()> {
        self.broadcast_tx
            .send(payload)
            .await
            .map_err(|_| TrickleError::HubUnavailable)
    }

    /// Ids of the connections registered when the hub serves this request
    pub async fn live_connections(&self) -> Result<Vec<ConnectionId>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inspect_tx
            .send(reply_tx)
            .await
            .map_err(|_| TrickleError::HubUnavailable)?;
        reply_rx.await.map_err(|_| TrickleError::HubUnavailable)
    }

    pub async fn connection_count(&self) -> Result<usize> {
        Ok(self.live_connections().await?.len())
    }
}
