use futures_util::sink::SinkExt;
use futures_util::stream::{SplitSink, SplitStream, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, timeout, timeout_at, Instant};
use warp::ws::{Message, WebSocket};

use crate::config::ServerConfig;
use crate::core::connection::{Connection, ConnectionId};
use crate::core::event::decode_event;
use crate::core::server::ServerState;
use crate::error::{Result, TrickleError};

// Handle an admitted WebSocket connection for `account_id` until either
// half of it fails
pub async fn handle_ws_client(ws: WebSocket, account_id: String, state: ServerState) {
    let (ws_tx, ws_rx) = ws.split();
    let (connection, queue) = Connection::new(account_id.clone(), state.config.send_buffer);
    let connection_id = connection.id;

    if let Err(e) = state.hub.register(connection).await {
        error!("Failed to register connection for {}: {}", account_id, e);
        return;
    }
    info!("Client connected: account {} on connection {}", account_id, connection_id);

    // Dropped by the write pump when it stops, which wakes the read pump
    let (writer_stopped_tx, writer_stopped_rx) = oneshot::channel::<()>();

    let config = state.config.clone();
    let writer = tokio::spawn(async move {
        match write_pump(ws_tx, queue, config, writer_stopped_tx).await {
            Ok(()) => debug!("Write pump for {} closed cleanly", connection_id),
            Err(e) => warn!("Write pump for {} stopped: {}", connection_id, e),
        }
    });

    match read_pump(ws_rx, &account_id, &state, writer_stopped_rx).await {
        Ok(()) => info!("Client disconnected: account {} on connection {}", account_id, connection_id),
        Err(e) => warn!("Terminating connection {} for account {}: {}", connection_id, account_id, e),
    }

    unregister(&state, connection_id).await;

    // The hub has dropped our queue, so the write pump sends a close frame
    // and returns
    if let Err(e) = writer.await {
        error!("Write pump for {} panicked: {}", connection_id, e);
    }
}

async fn unregister(state: &ServerState, connection_id: ConnectionId) {
    if let Err(e) = state.hub.unregister(connection_id).await {
        error!("Error unregistering connection {}: {}", connection_id, e);
    }
}

/// Inbound half: read frames, apply them, and watch the liveness deadline.
///
/// Returns `Ok` on an orderly close by the peer and `Err` for anything that
/// should be logged as a failure. Either way the caller unregisters.
async fn read_pump(
    mut ws_rx: SplitStream<WebSocket>,
    account_id: &str,
    state: &ServerState,
    mut writer_stopped: oneshot::Receiver<()>,
) -> Result<()> {
    let pong_timeout = state.config.pong_timeout;
    let mut deadline = Instant::now() + pong_timeout;

    loop {
        let frame = tokio::select! {
            _ = &mut writer_stopped => return Err(TrickleError::ConnectionClosed),
            next = timeout_at(deadline, ws_rx.next()) => match next {
                Err(_) => return Err(TrickleError::LivenessTimeout),
                Ok(None) => return Ok(()),
                Ok(Some(Err(e))) => return Err(TrickleError::ConnectionError(e.to_string())),
                Ok(Some(Ok(frame))) => frame,
            },
        };

        if frame.is_pong() {
            deadline = Instant::now() + pong_timeout;
            continue;
        }
        if frame.is_close() {
            return Ok(());
        }
        // Pings are answered by the protocol layer
        if !frame.is_text() && !frame.is_binary() {
            continue;
        }

        let data = frame.as_bytes();
        if data.len() > state.config.max_message_size {
            return Err(TrickleError::MessageTooLarge(data.len()));
        }

        let event = decode_event(data, account_id)?;
        state.dispatch(&event).await?;
        deadline = Instant::now() + pong_timeout;
    }
}

/// Outbound half: drain the queue onto the socket and probe liveness.
///
/// Returns once the hub closes the queue (after writing a close frame) or
/// on the first failed write. `_stopped` is dropped on return.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Message>,
    config: Arc<ServerConfig>,
    _stopped: oneshot::Sender<()>,
) -> Result<()> {
    let period = config.ping_interval();
    let mut probe = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            message = queue.recv() => match message {
                Some(message) => write_frame(&mut ws_tx, message, config.write_timeout).await?,
                None => {
                    write_frame(&mut ws_tx, Message::close(), config.write_timeout).await?;
                    return Ok(());
                }
            },
            _ = probe.tick() => {
                write_frame(&mut ws_tx, Message::ping(Vec::<u8>::new()), config.write_timeout).await?;
            }
        }
    }
}

async fn write_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    message: Message,
    deadline: Duration,
) -> Result<()> {
    match timeout(deadline, ws_tx.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TrickleError::ConnectionError(e.to_string())),
        Err(_) => Err(TrickleError::WriteTimeout),
    }
}
