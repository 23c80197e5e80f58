//! WebSocket connection management
//! The hub-side half of a live connection

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;
use warp::ws::Message;

pub type ConnectionId = Uuid;

/// Represents a single live WebSocket connection as seen by the hub.
///
/// Holds the only sending side of the connection's outbound queue, so
/// dropping a `Connection` closes the queue and stops its write pump.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub account_id: String,
    sender: mpsc::Sender<Message>,
    connected_at: Instant,
}

impl Connection {
    /// Create a connection bound to `account_id` with a bounded outbound
    /// queue. The receiver goes to the write pump.
    pub fn new(account_id: String, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let connection = Self {
            id: Uuid::new_v4(),
            account_id,
            sender,
            connected_at: Instant::now(),
        };
        (connection, receiver)
    }

    /// Non-blocking enqueue onto the outbound queue
    pub fn try_deliver(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.sender.try_send(message)
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
