//! Server configuration module
//! Handles dynamic configuration parameters for the game server

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_HOST, DEFAULT_HUB_BUFFER, DEFAULT_MAX_MESSAGE_SIZE,
    DEFAULT_PONG_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_SEND_BUFFER, DEFAULT_SNAPSHOT_INTERVAL_SECS,
    DEFAULT_STATIC_DIR, DEFAULT_TOKEN_TTL_HOURS, DEFAULT_WRITE_TIMEOUT_SECS,
};
use crate::error::{Result, TrickleError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for session token signing/validation
    pub jwt_secret: String,
    /// Lifetime of issued session tokens
    pub token_ttl: Duration,
    /// Where the account snapshot is written
    pub db_path: PathBuf,
    pub snapshot_interval: Duration,
    pub static_dir: PathBuf,
    /// Deadline for a single outbound frame write
    pub write_timeout: Duration,
    /// How long a peer may stay silent before it is presumed dead
    pub pong_timeout: Duration,
    /// Largest inbound message accepted, in bytes
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue
    pub send_buffer: usize,
    /// Capacity of each hub control channel
    pub hub_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: only for tests and local tooling
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-jwt-key-only-for-unit-tests-never-use-in-production".to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_HOURS * 3600),
            db_path: env::temp_dir().join(format!("trickle-test-{}.json", uuid::Uuid::new_v4())),
            snapshot_interval: Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            pong_timeout: Duration::from_secs(DEFAULT_PONG_TIMEOUT_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            send_buffer: DEFAULT_SEND_BUFFER,
            hub_buffer: DEFAULT_HUB_BUFFER,
        }
    }

    /// Interval between liveness probes: 90% of the pong deadline, so a
    /// probe always lands before the peer is presumed dead
    pub fn ping_interval(&self) -> Duration {
        self.pong_timeout * 9 / 10
    }

    /// Validate that a secret meets security requirements
    fn validate_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(TrickleError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = ["your-secret-key", "change-this", "foobar", "secret", "password", "12345"];

        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(TrickleError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Generate one with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TrickleError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols)".to_string(),
            ));
        }

        Ok(())
    }

    fn env_or<T: FromStr>(key: &str, default: T) -> T {
        env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("TRICKLE_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = Self::env_or("TRICKLE_PORT", DEFAULT_PORT);

        let jwt_secret = env::var("TRICKLE_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                TrickleError::ConfigError(
                    "JWT_SECRET environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_secret(&jwt_secret)?;

        let token_ttl_hours = Self::env_or("TRICKLE_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS);
        let db_path = env::var("TRICKLE_DB_PATH").unwrap_or(DEFAULT_DB_PATH.to_string());
        let snapshot_secs = Self::env_or("TRICKLE_SNAPSHOT_SECS", DEFAULT_SNAPSHOT_INTERVAL_SECS);
        let static_dir = env::var("TRICKLE_STATIC_DIR").unwrap_or(DEFAULT_STATIC_DIR.to_string());
        let write_secs = Self::env_or("TRICKLE_WRITE_TIMEOUT_SECS", DEFAULT_WRITE_TIMEOUT_SECS);
        let pong_secs = Self::env_or("TRICKLE_PONG_TIMEOUT_SECS", DEFAULT_PONG_TIMEOUT_SECS);
        let max_message_size = Self::env_or("TRICKLE_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE);
        let send_buffer = Self::env_or("TRICKLE_SEND_BUFFER", DEFAULT_SEND_BUFFER);
        let hub_buffer = Self::env_or("TRICKLE_HUB_BUFFER", DEFAULT_HUB_BUFFER);

        let config = Self {
            host,
            port,
            jwt_secret,
            token_ttl: Self::token_ttl_from_hours(token_ttl_hours)?,
            db_path: PathBuf::from(db_path),
            snapshot_interval: Duration::from_secs(snapshot_secs),
            static_dir: PathBuf::from(static_dir),
            write_timeout: Duration::from_secs(write_secs),
            pong_timeout: Duration::from_secs(pong_secs),
            max_message_size,
            send_buffer,
            hub_buffer,
        };
        config.validate()?;
        Ok(config)
    }

    fn token_ttl_from_hours(hours: u64) -> Result<Duration> {
        hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| TrickleError::ConfigError(format!("TRICKLE_TOKEN_TTL_HOURS={} is out of range", hours)))
    }

    /// Reject limits that would make every connection fail
    fn validate(&self) -> Result<()> {
        let zero = [
            ("TRICKLE_PONG_TIMEOUT_SECS", self.pong_timeout.is_zero()),
            ("TRICKLE_SNAPSHOT_SECS", self.snapshot_interval.is_zero()),
            ("TRICKLE_WRITE_TIMEOUT_SECS", self.write_timeout.is_zero()),
            ("TRICKLE_MAX_MESSAGE_SIZE", self.max_message_size == 0),
            ("TRICKLE_SEND_BUFFER", self.send_buffer == 0),
            ("TRICKLE_HUB_BUFFER", self.hub_buffer == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((key, _)) => Err(TrickleError::ConfigError(format!("{} must be positive", key))),
            None => Ok(()),
        }
    }
}
