//! In-memory account registry
//!
//! Accounts are kept in a `BTreeMap` keyed by id so that every pass over
//! the registry (collision checks, snapshots) walks them in the same order.
//! All mutation goes through the registry's write lock, which serializes
//! concurrent events that touch the same account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::constants::{ACCOUNT_HEIGHT, ACCOUNT_WIDTH, MAX_USERNAME_LENGTH, STARTING_HEALTH};
use crate::core::event::PositionView;
use crate::core::geometry::{Direction, Rect};
use crate::error::{Result, TrickleError};

/// A player account and its live game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub health: u32,
    pub position: Rect,
    pub facing: Direction,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a fresh account at the spawn point with full health
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            health: STARTING_HEALTH,
            position: Rect::new(0.0, 0.0, ACCOUNT_WIDTH, ACCOUNT_HEIGHT),
            facing: Direction::default(),
            created_at: Utc::now(),
        }
    }

    /// Public projection, safe to hand to clients
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            username: self.username.clone(),
            attributes: Attributes { health: self.health },
            position: PositionView::new(&self.position, self.facing),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributes {
    pub health: u32,
}

/// Account as returned by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub attributes: Attributes,
    pub position: PositionView,
}

/// The account table itself. Only reachable through an `AccountRegistry`
/// guard, so holding `&mut Accounts` means holding the write lock.
#[derive(Debug, Default)]
pub struct Accounts {
    by_id: BTreeMap<String, Account>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        Self {
            by_id: accounts.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.by_id.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.by_id.values().find(|a| a.username == username)
    }

    /// Insert a new account, refusing display names already in use
    pub fn insert(&mut self, account: Account) -> Result<()> {
        if self.find_by_username(&account.username).is_some() {
            return Err(TrickleError::UsernameTaken(account.username));
        }
        self.by_id.insert(account.id.clone(), account);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Account> {
        self.by_id.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Account> {
        self.by_id.values().cloned().collect()
    }
}

/// Shared handle to the account table
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    inner: Arc<RwLock<Accounts>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Accounts::from_accounts(accounts))),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Accounts> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Accounts> {
        self.inner.write().await
    }

    /// Create an account with a unique display name
    pub async fn create(&self, username: &str, password_hash: String) -> Result<Account> {
        let username = username.trim();
        if username.is_empty() {
            return Err(TrickleError::ValidationError("username cannot be empty".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(TrickleError::ValidationError(format!(
                "username longer than {} characters",
                MAX_USERNAME_LENGTH
            )));
        }

        let account = Account::new(username.to_string(), password_hash);
        self.write().await.insert(account.clone())?;
        Ok(account)
    }

    pub async fn get(&self, id: &str) -> Result<Account> {
        self.read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TrickleError::AccountNotFound(id.to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Account> {
        self.read()
            .await
            .find_by_username(username)
            .cloned()
            .ok_or_else(|| TrickleError::AccountNotFound(username.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.read().await.contains(id)
    }

    pub async fn snapshot(&self) -> Vec<Account> {
        self.read().await.to_vec()
    }

    pub async fn count(&self) -> usize {
        self.read().await.len()
    }
}
