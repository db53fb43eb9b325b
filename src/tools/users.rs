//! Tools for the authenticated user's account.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::args::{self, Arguments};
use super::{Tool, ToolError};
use crate::htb::{field, Backend};
use crate::mcp::protocol::{CallToolResult, Property, ToolSchema};

const PROGRESS_TYPES: [&str; 3] = ["overview", "machines", "challenges"];

/// `get_user_profile`.
pub struct GetUserProfile {
    backend: Arc<dyn Backend>,
}

impl GetUserProfile {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetUserProfile {
    fn name(&self) -> &'static str {
        "get_user_profile"
    }

    fn description(&self) -> &'static str {
        "Get the authenticated user's profile information including points, rank, and subscription status"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
    }

    async fn invoke(&self, _arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let info = field(self.backend.get("/user/info").await?, "info");
        Ok(CallToolResult::json(&info)?)
    }
}

/// `get_user_progress`.
///
/// The API has a single account endpoint, so every progress type reads the
/// same document; the type is echoed back so clients can tell answers apart.
pub struct GetUserProgress {
    backend: Arc<dyn Backend>,
}

impl GetUserProgress {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetUserProgress {
    fn name(&self) -> &'static str {
        "get_user_progress"
    }

    fn description(&self) -> &'static str {
        "Get user progress including completed challenges, machines, and achievements"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property(
                "type",
                Property::string("Type of progress to retrieve")
                    .one_of(&PROGRESS_TYPES)
                    .with_default("overview"),
            )
            .property(
                "limit",
                Property::integer("Limit the number of results").with_default(50),
            )
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let progress_type = args::choice(&arguments, "type", &PROGRESS_TYPES, "overview")?;
        // Accepted for client compatibility; the profile endpoint returns a summary.
        args::positive_int(&arguments, "limit", 50)?;
        debug!(progress_type, "Fetching user progress");

        let info = field(self.backend.get("/user/info").await?, "info");

        Ok(CallToolResult::json(&json!({
            "type": progress_type,
            "progress": info,
        }))?)
    }
}
