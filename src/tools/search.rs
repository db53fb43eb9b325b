//! Search and server status tools.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

use super::args::{self, Arguments};
use super::{Tool, ToolError};
use crate::htb::Backend;
use crate::mcp::protocol::{CallToolResult, Property, ToolSchema, SERVER_VERSION};

const SEARCH_TYPES: [&str; 4] = ["all", "machines", "challenges", "users"];

/// `search_content`: keyword search across machines, challenges and users.
pub struct SearchContent {
    backend: Arc<dyn Backend>,
}

impl SearchContent {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SearchContent {
    fn name(&self) -> &'static str {
        "search_content"
    }

    fn description(&self) -> &'static str {
        "Search across HackTheBox challenges, machines, and users by name or keyword"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property("query", Property::string("Search query string"))
            .property(
                "type",
                Property::string("Type of content to search")
                    .one_of(&SEARCH_TYPES)
                    .with_default("all"),
            )
            .require(&["query"])
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let query = args::required_str(&arguments, "query")?;
        let search_type = args::choice(&arguments, "type", &SEARCH_TYPES, "all")?;
        debug!(query, search_type, "Searching content");

        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("query", query)
            .finish();
        let results = self.backend.get(&format!("/search/fetch?{encoded}")).await?;

        Ok(CallToolResult::json(&select_section(results, search_type))?)
    }
}

/// Narrows a search response to one section, unless `section` is `all`.
///
/// A section missing from the response yields an empty object.
fn select_section(results: Value, section: &str) -> Value {
    if section == "all" {
        return results;
    }
    match results {
        Value::Object(mut sections) => {
            let mut selected = Map::new();
            if let Some(items) = sections.remove(section).filter(|v| !v.is_null()) {
                selected.insert(section.to_string(), items);
            }
            Value::Object(selected)
        }
        other => other,
    }
}

/// Status document returned by `get_server_status`.
#[derive(Debug, Serialize)]
struct ServerStatus {
    status: &'static str,
    version: &'static str,
    htb_api_status: String,
    uptime: String,
    timestamp: DateTime<Utc>,
}

/// `get_server_status`: liveness of this server and of the HTB API.
pub struct GetServerStatus {
    backend: Arc<dyn Backend>,
    started: Instant,
}

impl GetServerStatus {
    /// Creates the tool. Uptime is measured from this call.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl Tool for GetServerStatus {
    fn name(&self) -> &'static str {
        "get_server_status"
    }

    fn description(&self) -> &'static str {
        "Get MCP server health status and HTB API connectivity information"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
    }

    async fn invoke(&self, _arguments: Arguments) -> Result<CallToolResult, ToolError> {
        // A failed probe is part of the answer, not a tool failure.
        let htb_api_status = match self.backend.health_check().await {
            Ok(()) => "healthy".to_string(),
            Err(e) => format!("unhealthy: {e}"),
        };

        let status = ServerStatus {
            status: "running",
            version: SERVER_VERSION,
            htb_api_status,
            uptime: format_uptime(self.started.elapsed()),
            timestamp: Utc::now(),
        };

        Ok(CallToolResult::json(&status)?)
    }
}

/// Formats a duration as `1h2m3s`, dropping leading zero units.
fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
