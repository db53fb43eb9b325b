//! Error types for htb-mcp-server.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include the HTB token.
//! Variants that could carry sensitive data name the offending variable
//! instead of echoing its value.

use thiserror::Error;

use crate::htb::BackendError;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("{name} environment variable is required")]
    MissingVariable {
        /// Name of the environment variable.
        name: &'static str,
    },

    /// An environment variable is set but its value is unusable.
    #[error("invalid {name}: {message}")]
    InvalidValue {
        /// Name of the environment variable.
        name: &'static str,
        /// Description of the problem (never the value itself).
        message: String,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that stop the protocol engine.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The backend health probe failed, so the server never started.
    #[error("HTB API health check failed: {0}")]
    Startup(#[source] BackendError),

    /// `run` was called before a successful `start`.
    #[error("server is not running (state: {state})")]
    NotRunning {
        /// The state the server was in.
        state: &'static str,
    },

    /// Reading from or writing to the transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
