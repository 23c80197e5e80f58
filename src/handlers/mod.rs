//! Request handlers for the server endpoints

pub mod accounts;
pub mod admission;
pub mod rejection;
pub mod websocket;

use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::core::server::ServerState;

pub use admission::admit;
pub use rejection::handle_rejection;
pub use websocket::handle_ws_client;

/// Include the shared state in a request
pub fn with_state(state: ServerState) -> impl Filter<Extract = (ServerState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Every route the server exposes, with JSON error bodies and CORS applied
pub fn routes(state: ServerState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let static_dir = state.config.static_dir.clone();

    let health = warp::path("health").and(warp::path::end()).map(|| "OK");
    let index = warp::get()
        .and(warp::path::end())
        .and(warp::fs::file(static_dir.join("index.html")));
    let assets = warp::path("static").and(warp::fs::dir(static_dir));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    admission::connect_route(state.clone())
        .or(accounts::sign_up_route(state.clone()))
        .or(accounts::login_route(state))
        .or(health)
        .or(index)
        .or(assets)
        .recover(handle_rejection)
        .with(cors)
}
