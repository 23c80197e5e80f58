// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const WS_PATH: &str = "connect";
pub const AUTH_QUERY_PARAM: &str = "auth";

pub const DEFAULT_DB_PATH: &str = "db.json";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 72;

// Connection liveness and sizing
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PONG_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512;
pub const DEFAULT_SEND_BUFFER: usize = 256;
pub const DEFAULT_HUB_BUFFER: usize = 64;

// Arena geometry, in pixels
pub const TILE_WIDTH: f64 = 16.0;
pub const MAP_TILES: f64 = 100.0;
pub const MAP_WIDTH: f64 = MAP_TILES * TILE_WIDTH;
pub const MAP_HEIGHT: f64 = MAP_TILES * TILE_WIDTH;
pub const MOVE_STEP: f64 = 1.0;

// Accounts
pub const STARTING_HEALTH: u32 = 6;
pub const ACCOUNT_WIDTH: f64 = TILE_WIDTH;
pub const ACCOUNT_HEIGHT: f64 = TILE_WIDTH * 2.0;
pub const MAX_USERNAME_LENGTH: usize = 32;
