//! Account endpoints: `POST /sign_up` and `POST /login`

use log::{info, warn};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::auth::password::{hash_password, verify_password};
use crate::core::server::ServerState;
use crate::error::{Result, TrickleError};
use crate::handlers::with_state;
use crate::storage::accounts::AccountView;

const BODY_LIMIT: u64 = 4 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
}

pub fn sign_up_route(state: ServerState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("sign_up")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(|credentials: Credentials, state: ServerState| async move {
            match create_account(credentials, &state).await {
                Ok(view) => Ok(warp::reply::with_status(
                    warp::reply::json(&view),
                    StatusCode::CREATED,
                )),
                Err(e) => Err(warp::reject::custom(e)),
            }
        })
}

pub fn login_route(state: ServerState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(|credentials: Credentials, state: ServerState| async move {
            match login(credentials, &state).await {
                Ok(response) => Ok(warp::reply::with_status(
                    warp::reply::json(&response),
                    StatusCode::CREATED,
                )),
                Err(e) => Err(warp::reject::custom(e)),
            }
        })
}

/// Register a new account and return its public view
pub async fn create_account(credentials: Credentials, state: &ServerState) -> Result<AccountView> {
    if credentials.password.is_empty() {
        return Err(TrickleError::ValidationError("password cannot be empty".to_string()));
    }

    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| TrickleError::SystemError(format!("hashing task failed: {}", e)))??;

    let account = state.accounts.create(&credentials.username, password_hash).await?;
    info!("Signed up account {} ({})", account.id, account.username);
    Ok(account.view())
}

/// Check credentials and mint a session token
pub async fn login(credentials: Credentials, state: &ServerState) -> Result<LoginResponse> {
    let account = state.accounts.find_by_username(credentials.username.trim()).await?;

    let password = credentials.password;
    let stored = account.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| TrickleError::SystemError(format!("verification task failed: {}", e)))?;
    if let Err(e) = verified {
        warn!("Failed login for {}", account.username);
        return Err(e);
    }

    let token = state.tokens.issue(&account.id)?;
    info!("Account {} logged in", account.username);
    Ok(LoginResponse {
        user_id: account.id,
        token,
    })
}
