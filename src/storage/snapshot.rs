//! Periodic snapshot of the account registry to a JSON file
//!
//! The file is rewritten whole on every interval. Writes go to a sibling
//! temporary file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::{Result, TrickleError};
use crate::storage::accounts::{Account, AccountRegistry};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    saved_at: DateTime<Utc>,
    accounts: Vec<Account>,
}

/// Load accounts from `path`. A missing file is an empty registry.
pub async fn load(path: &Path) -> Result<Vec<Account>> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No snapshot at {}, starting with an empty registry", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let snapshot: SnapshotFile = serde_json::from_slice(&data).map_err(|e| {
        TrickleError::StorageError(format!("corrupt snapshot {}: {}", path.display(), e))
    })?;

    info!(
        "Loaded {} accounts from snapshot taken at {}",
        snapshot.accounts.len(),
        snapshot.saved_at
    );
    Ok(snapshot.accounts)
}

/// Write the current registry contents to `path`
pub async fn save(registry: &AccountRegistry, path: &Path) -> Result<usize> {
    let snapshot = SnapshotFile {
        saved_at: Utc::now(),
        accounts: registry.snapshot().await,
    };
    let data = serde_json::to_vec(&snapshot)
        .map_err(|e| TrickleError::StorageError(format!("failed to encode snapshot: {}", e)))?;

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, path).await?;

    Ok(snapshot.accounts.len())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Start the background task that snapshots the registry every `period`
pub fn start_snapshot_task(registry: AccountRegistry, path: PathBuf, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing has changed yet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match save(&registry, &path).await {
                Ok(count) => debug!("Snapshot of {} accounts written to {}", count, path.display()),
                Err(e) => error!("Failed to write snapshot to {}: {}", path.display(), e),
            }
        }
    })
}
