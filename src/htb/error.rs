//! Error types for HackTheBox API calls.
//!
//! Messages never include the API token.

use std::time::Duration;

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to the HackTheBox API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The API rejected the token.
    #[error("unauthorized: HTB token is invalid")]
    Unauthorized,

    /// The API redirected to a login page, which happens for expired tokens.
    #[error("HTB token appears invalid or expired")]
    InvalidToken,

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with a non-success status.
    #[error("HTB API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("failed to execute request: {0}")]
    Http(#[source] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request path could not be joined onto the base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The client could not be built from the supplied settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport failures, timeouts, rate limiting and server errors are
    /// retryable; authentication failures and domain rejections are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Unauthorized
            | Self::InvalidToken
            | Self::Decode(_)
            | Self::InvalidUrl(_)
            | Self::Configuration(_) => false,
        }
    }

    /// Builds an API error from a status code and response body.
    ///
    /// HTB error bodies look like `{"message": "..."}`; anything else is
    /// reported verbatim.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        Self::Api { status, message }
    }
}
