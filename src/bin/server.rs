use log::{error, info, warn};
use std::net::SocketAddr;

use northern_trickle::config::ServerConfig;
use northern_trickle::constants::WS_PATH;
use northern_trickle::core::server::ServerState;
use northern_trickle::handlers::routes;
use northern_trickle::storage::snapshot;
use northern_trickle::storage::AccountRegistry;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, db={}, pong_timeout={:?}",
        config.host,
        config.port,
        config.db_path.display(),
        config.pong_timeout
    );

    let accounts = match snapshot::load(&config.db_path).await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to load accounts from {}: {}", config.db_path.display(), e);
            std::process::exit(1);
        }
    };
    info!("Loaded {} accounts", accounts.len());

    let registry = AccountRegistry::with_accounts(accounts);
    let db_path = config.db_path.clone();
    let snapshots = snapshot::start_snapshot_task(registry.clone(), db_path.clone(), config.snapshot_interval);

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let state = ServerState::start(config, registry.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown requested");
    };

    let (bound, server) = match warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok(bound) => bound,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Starting Northern Trickle server on {} (ws path /{})", bound, WS_PATH);
    server.await;

    snapshots.abort();
    match snapshot::save(&registry, &db_path).await {
        Ok(count) => info!("Saved {} accounts to {}", count, db_path.display()),
        Err(e) => error!("Final snapshot failed: {}", e),
    }
}
