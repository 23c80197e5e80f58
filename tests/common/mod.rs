// Shared helpers for the integration tests: an in-process server bound to
// an ephemeral port plus a few WebSocket client conveniences

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use northern_trickle::config::ServerConfig;
use northern_trickle::core::server::ServerState;
use northern_trickle::handlers::routes;
use northern_trickle::storage::AccountRegistry;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: ServerState,
}

impl TestServer {
    pub fn start() -> Self {
        Self::with_config(ServerConfig::for_testing())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = ServerState::start(config, AccountRegistry::new());
        let (addr, server) = warp::serve(routes(state.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        Self { addr, state }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/connect?auth={}", self.addr, token)
    }

    /// Create an account directly in the registry and mint a token for it
    pub async fn account(&self, username: &str) -> (String, String) {
        let account = self
            .state
            .accounts
            .create(username, "unused-hash".to_string())
            .await
            .expect("create account");
        let token = self.state.tokens.issue(&account.id).expect("issue token");
        (account.id, token)
    }

    pub async fn connect(&self, token: &str) -> Client {
        let (client, _response) = connect_async(self.ws_url(token)).await.expect("websocket connect");
        client
    }

    /// Poll the hub until it reports `expected` live connections
    pub async fn wait_for_connections(&self, expected: usize) -> bool {
        for _ in 0..100 {
            if self.state.hub.connection_count().await.expect("hub running") == expected {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

/// Next text frame as JSON, skipping control frames
pub async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("valid JSON frame");
        }
    }
}

/// True once the server has closed the socket
pub async fn is_closed(client: &mut Client) -> bool {
    loop {
        match timeout(Duration::from_secs(5), client.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// True if nothing but control frames arrives within `wait`
pub async fn stays_quiet(client: &mut Client, wait: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Err(_) => return true,
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            Ok(_) => return false,
        }
    }
}
