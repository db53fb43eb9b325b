//! MCP tools exposing HackTheBox operations.
//!
//! Every tool implements [`Tool`]: a fixed name, a description, an input
//! schema for discovery, and an async `invoke`. Tools hold a shared
//! [`Backend`](crate::htb::Backend) and never touch HTTP directly.
//!
//! | Tool | Module |
//! |---|---|
//! | `list_challenges`, `start_challenge`, `submit_challenge_flag` | [`challenges`] |
//! | `list_machines`, `start_machine`, `get_machine_ip`, `submit_user_flag`, `submit_root_flag` | [`machines`] |
//! | `get_user_profile`, `get_user_progress` | [`users`] |
//! | `search_content`, `get_server_status` | [`search`] |

pub mod args;
pub mod challenges;
mod error;
pub mod machines;
mod registry;
pub mod search;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ToolError;
pub use registry::ToolRegistry;

use async_trait::async_trait;

use crate::mcp::protocol::{CallToolResult, ToolDescriptor, ToolSchema};
use args::Arguments;

/// A named, schema-described operation callable through `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// One-line description shown to clients.
    fn description(&self) -> &'static str;

    /// Input schema. Every required name must be a declared property.
    fn schema(&self) -> ToolSchema;

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] for bad input and
    /// [`ToolError::Backend`] when the HTB API call fails.
    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError>;

    /// Descriptor for `tools/list`.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

/// Difficulty labels accepted by the listing tools.
pub(crate) const DIFFICULTIES: [&str; 4] = ["Easy", "Medium", "Hard", "Insane"];

/// Whether any of `keys` in `item` holds `wanted`, ignoring ASCII case.
///
/// The API is not consistent about field names across endpoints
/// (`difficulty` vs `difficultyText`, `category` vs `category_name`).
pub(crate) fn field_matches(item: &serde_json::Value, keys: &[&str], wanted: &str) -> bool {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(serde_json::Value::as_str))
        .any(|value| value.eq_ignore_ascii_case(wanted))
}

/// Returns page `page` (1-based) of `items`.
pub(crate) fn paginate<T>(items: Vec<T>, page: u64, per_page: u64) -> Vec<T> {
    let per_page = usize::try_from(per_page).unwrap_or(usize::MAX);
    let skip = usize::try_from(page.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .saturating_mul(per_page);
    items.into_iter().skip(skip).take(per_page).collect()
}
