//! Core functionality for the game server

pub mod connection;
pub mod event;
pub mod game;
pub mod geometry;
pub mod hub;
pub mod server;

// Re-export main components for convenience
pub use connection::{Connection, ConnectionId};
pub use event::{decode_event, Action, Event, EventKind, Outbound};
pub use geometry::{Arena, Direction, Rect};
pub use hub::{create_hub, Hub, HubHandle};
pub use server::ServerState;
