//! Admission gate in front of the WebSocket upgrade
//!
//! A client presents its session token as the `auth` query parameter of
//! the upgrade request. The token is verified and resolved to a live
//! account before the upgrade is accepted; any failure rejects the request
//! with no connection, no hub registration and no pump.

use log::{debug, warn};
use std::collections::HashMap;
use warp::ws::Ws;
use warp::{Filter, Rejection, Reply};

use crate::constants::{AUTH_QUERY_PARAM, WS_PATH};
use crate::core::server::ServerState;
use crate::error::{Result, TrickleError};
use crate::handlers::websocket::handle_ws_client;
use crate::handlers::with_state;
use crate::storage::accounts::Account;

/// Verify a session token and resolve it to an existing account
pub async fn admit(token: Option<&str>, state: &ServerState) -> Result<Account> {
    let token = match token {
        Some(token) if !token.is_empty() => token,
        _ => return Err(TrickleError::MissingToken),
    };

    // Reject obviously bogus input before touching the verifier
    if token.len() > 2048 || token.chars().any(|c| c.is_control()) {
        return Err(TrickleError::AuthError("malformed token".to_string()));
    }

    let account_id = state.tokens.verify(token)?;
    state.accounts.get(&account_id).await
}

/// `GET /connect?auth=<token>` upgrade route
pub fn connect_route(state: ServerState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state))
        .and_then(upgrade)
}

async fn upgrade(
    ws: Ws,
    query: HashMap<String, String>,
    state: ServerState,
) -> std::result::Result<impl Reply, Rejection> {
    let account = match admit(query.get(AUTH_QUERY_PARAM).map(String::as_str), &state).await {
        Ok(account) => account,
        Err(e) => {
            warn!("WebSocket admission refused: {}", e);
            return Err(warp::reject::custom(e));
        }
    };

    debug!("Admitted account {} ({})", account.id, account.username);
    let max_size = state.config.max_message_size;
    Ok(ws
        .max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handle_ws_client(socket, account.id, state)))
}
