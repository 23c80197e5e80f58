//! Account storage and its on-disk snapshot

pub mod accounts;
pub mod snapshot;

pub use accounts::{Account, AccountRegistry, AccountView, Accounts};
