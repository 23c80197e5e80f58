use std::error::Error;
use std::fmt;

use warp::http::StatusCode;

#[derive(Debug)]
pub enum TrickleError {
    // Connection errors
    ConnectionError(String),
    ConnectionClosed,
    LivenessTimeout,
    WriteTimeout,
    MessageTooLarge(usize),

    // Codec errors
    MessageParseError(String),
    MessageEncodeError(String),

    // Hub errors
    HubUnavailable,

    // Admission / auth errors
    MissingToken,
    AuthError(String),
    TokenExpired,
    AccountNotFound(String),

    // Account errors
    UsernameTaken(String),
    InvalidCredentials,
    ValidationError(String),

    // Storage errors
    StorageError(String),

    // System errors
    SystemError(String),

    // Configuration errors
    ConfigError(String),
}

impl TrickleError {
    /// HTTP status used when this error ends a request
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::UsernameTaken(_)
            | Self::InvalidCredentials
            | Self::ValidationError(_)
            | Self::MessageParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AuthError(_) | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::MessageTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for TrickleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::LivenessTimeout => write!(f, "Peer missed its liveness deadline"),
            Self::WriteTimeout => write!(f, "Write deadline exceeded"),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageEncodeError(msg) => write!(f, "Message encode error: {}", msg),
            Self::HubUnavailable => write!(f, "Hub is no longer running"),
            Self::MissingToken => write!(f, "auth param is required"),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::AccountNotFound(id) => write!(f, "Account not found: {}", id),
            Self::UsernameTaken(name) => write!(f, "Username taken: {}", name),
            Self::InvalidCredentials => write!(f, "Password does not match"),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for TrickleError {}

impl warp::reject::Reject for TrickleError {}

impl From<serde_json::Error> for TrickleError {
    fn from(err: serde_json::Error) -> Self {
        TrickleError::MessageParseError(err.to_string())
    }
}

impl From<std::io::Error> for TrickleError {
    fn from(err: std::io::Error) -> Self {
        TrickleError::StorageError(err.to_string())
    }
}

// Generic result type for the server
pub type Result<T> = std::result::Result<T, TrickleError>;
