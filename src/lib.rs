//! Northern Trickle - a realtime multiplayer session server over WebSockets
//!
//! This library provides the connection hub, the per-connection pumps,
//! token-based admission and the event dispatcher that applies movement,
//! collision and combat to a shared account registry.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::ServerConfig;
pub use constants::*;
pub use error::{Result, TrickleError};
