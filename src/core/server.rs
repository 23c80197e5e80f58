//! Shared server state: the hub, the account registry and the token
//! verifier, handed to every request handler and connection task

use log::debug;
use std::sync::Arc;

use crate::auth::token::TokenManager;
use crate::config::ServerConfig;
use crate::core::event::Event;
use crate::core::game;
use crate::core::geometry::Arena;
use crate::core::hub::{create_hub, HubHandle};
use crate::error::Result;
use crate::storage::accounts::AccountRegistry;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub accounts: AccountRegistry,
    pub tokens: Arc<TokenManager>,
    pub hub: HubHandle,
    pub arena: Arena,
}

impl ServerState {
    /// Build the state and spawn the hub's coordination loop. The hub runs
    /// until the last clone of this state is dropped.
    pub fn start(config: ServerConfig, accounts: AccountRegistry) -> Self {
        let (hub, handle) = create_hub(config.hub_buffer);
        tokio::spawn(hub.run());

        let tokens = TokenManager::new(&config.jwt_secret, config.token_ttl);

        Self {
            config: Arc::new(config),
            accounts,
            tokens: Arc::new(tokens),
            hub: handle,
            arena: Arena::default(),
        }
    }

    /// Apply an event to the world and submit its broadcasts to the hub.
    ///
    /// The registry write lock is held until every broadcast is queued, so
    /// the order clients observe matches the order mutations happened in.
    pub async fn dispatch(&self, event: &Event) -> Result<usize> {
        let mut accounts = self.accounts.write().await;
        let outbound = game::apply(&mut accounts, &self.arena, event);

        for update in &outbound {
            self.hub.broadcast(update.encode()?).await?;
        }

        debug!("Event {:?} from {} produced {} broadcasts", event.action, event.user_id, outbound.len());
        Ok(outbound.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::Connection;
    use crate::core::event::Action;
    use crate::core::geometry::Direction;

    #[tokio::test]
    async fn test_dispatch_broadcasts_to_registered_connections() {
        let state = ServerState::start(ServerConfig::for_testing(), AccountRegistry::new());
        let alice = state.accounts.create("alice", "h".to_string()).await.unwrap();
        let (connection, mut rx) = Connection::new(alice.id.clone(), 8);
        state.hub.register(connection).await.unwrap();

        let event = Event {
            user_id: alice.id.clone(),
            action: Action::Move(Direction::South),
        };
        assert_eq!(state.dispatch(&event).await.unwrap(), 1);

        let frame = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.to_str().unwrap()).unwrap();
        assert_eq!(value["type"], 0);
        assert_eq!(value["user_id"], alice.id.as_str());
        assert_eq!(value["body"]["dimensions"]["y"], 1.0);
    }

    #[tokio::test]
    async fn test_dispatch_elimination_emits_two_broadcasts() {
        let state = ServerState::start(ServerConfig::for_testing(), AccountRegistry::new());
        let alice = state.accounts.create("alice", "h".to_string()).await.unwrap();
        let bob = state.accounts.create("bob", "h".to_string()).await.unwrap();
        state.accounts.write().await.get_mut(&bob.id).unwrap().health = 1;

        let (connection, mut rx) = Connection::new(alice.id.clone(), 8);
        state.hub.register(connection).await.unwrap();

        let attack = Event {
            user_id: alice.id.clone(),
            action: Action::Attack,
        };
        assert_eq!(state.dispatch(&attack).await.unwrap(), 2);
        assert!(!state.accounts.contains(&bob.id).await);

        let damage: serde_json::Value =
            serde_json::from_str(rx.recv().await.unwrap().to_str().unwrap()).unwrap();
        assert_eq!(damage["type"], 2);
        assert_eq!(damage["user_id"], bob.id.as_str());
        assert_eq!(damage["body"]["health"], 0);

        let notice: serde_json::Value =
            serde_json::from_str(rx.recv().await.unwrap().to_str().unwrap()).unwrap();
        assert_eq!(notice["type"], 3);
        assert_eq!(notice["body"]["msg"], "alice is dominating bob!");

        // Second attack finds nobody to hit
        assert_eq!(state.dispatch(&attack).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_under_lock_drains_through_small_hub_buffer() {
        let mut config = ServerConfig::for_testing();
        config.hub_buffer = 1;
        let state = ServerState::start(config, AccountRegistry::new());
        let alice = state.accounts.create("alice", "h".to_string()).await.unwrap();
        let (connection, mut rx) = Connection::new(alice.id.clone(), 128);
        state.hub.register(connection).await.unwrap();

        let mut senders = Vec::new();
        for n in 0..32 {
            let state = state.clone();
            let event = Event {
                user_id: alice.id.clone(),
                action: Action::Chat(format!("msg-{}", n)),
            };
            senders.push(tokio::spawn(async move { state.dispatch(&event).await }));
        }

        let all = async {
            for sender in senders {
                assert_eq!(sender.await.unwrap().unwrap(), 1);
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), all)
            .await
            .expect("dispatch stalled behind the registry lock");

        assert_eq!(state.hub.connection_count().await.unwrap(), 1);
        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 32);
    }
}
