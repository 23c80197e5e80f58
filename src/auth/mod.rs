//! Session tokens and password hashing

pub mod password;
pub mod token;

// Re-export main components
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenManager};
