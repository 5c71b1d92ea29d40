//! cfstream Core Library
//!
//! Domain models, error types and configuration shared by every cfstream crate.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult, ErrorKind};
