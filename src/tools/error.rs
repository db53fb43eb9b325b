//! Tool invocation errors.

use std::time::Duration;

use thiserror::Error;

use crate::htb::BackendError;

/// Why a tool call failed.
///
/// None of these are protocol faults; the server reports every variant to
/// the client as an `isError` tool result.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// An argument is missing, has the wrong type, or is out of range.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The HTB API call failed.
    #[error("HTB API request failed: {0}")]
    Backend(#[from] BackendError),

    /// The result could not be rendered as JSON.
    #[error("failed to serialise result: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The call did not finish within the configured limit.
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),
}

impl ToolError {
    /// Shorthand for [`ToolError::InvalidArgument`].
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if repeating the same call might succeed.
    ///
    /// Transport trouble and timeouts are transient; a rejected flag or a
    /// bad argument is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            Self::NotFound(_) | Self::InvalidArgument { .. } | Self::Serialization(_) => false,
        }
    }
}
