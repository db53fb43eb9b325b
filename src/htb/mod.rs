//! HackTheBox API access.
//!
//! Tools never talk HTTP themselves. They go through the [`Backend`] trait,
//! which has a single required operation (an authenticated request returning
//! parsed JSON) plus the health probe used to gate server startup.
//! [`HtbClient`] is the `reqwest` implementation used in production.

pub mod client;
pub mod error;

pub use client::HtbClient;
pub use error::{BackendError, BackendResult};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// The authenticated HTTP collaborator used by every tool.
///
/// Implementations must enforce a timeout, report rejected credentials as
/// [`BackendError::Unauthorized`] or [`BackendError::InvalidToken`], and turn
/// transport failures and non-success statuses into errors rather than
/// partial data.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Performs an authenticated request against an API path such as
    /// `/user/info` and returns the decoded JSON body (`null` when empty).
    async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BackendResult<Value>;

    /// Verifies the API is reachable and the token is accepted.
    async fn health_check(&self) -> BackendResult<()>;

    /// GET shorthand.
    async fn get(&self, path: &str) -> BackendResult<Value> {
        self.authenticated_request(Method::GET, path, None).await
    }

    /// POST shorthand.
    async fn post(&self, path: &str, body: Option<&Value>) -> BackendResult<Value> {
        self.authenticated_request(Method::POST, path, body).await
    }
}

/// Extracts a top-level field from an API response.
///
/// An empty `field` returns the whole document. A missing field, or a
/// response that is not an object, yields `null`.
#[must_use]
pub fn field(mut response: Value, field: &str) -> Value {
    if field.is_empty() {
        return response;
    }
    response
        .as_object_mut()
        .and_then(|obj| obj.remove(field))
        .unwrap_or(Value::Null)
}
