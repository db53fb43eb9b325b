//! Name-to-tool lookup used for discovery and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::args::Arguments;
use super::challenges::{ListChallenges, StartChallenge, SubmitChallengeFlag};
use super::machines::{GetMachineIp, ListMachines, StartMachine, SubmitRootFlag, SubmitUserFlag};
use super::search::{GetServerStatus, SearchContent};
use super::users::{GetUserProfile, GetUserProgress};
use super::{Tool, ToolError};
use crate::htb::Backend;
use crate::mcp::protocol::{CallToolResult, ToolDescriptor};

/// Registered tools, keyed by name.
///
/// Built once at startup and then only read.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the twelve HackTheBox tools.
    #[must_use]
    pub fn with_htb_tools(backend: &Arc<dyn Backend>) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(ListChallenges::new(Arc::clone(backend))));
        registry.register(Arc::new(StartChallenge::new(Arc::clone(backend))));
        registry.register(Arc::new(SubmitChallengeFlag::new(Arc::clone(backend))));

        registry.register(Arc::new(ListMachines::new(Arc::clone(backend))));
        registry.register(Arc::new(StartMachine::new(Arc::clone(backend))));
        registry.register(Arc::new(GetMachineIp::new(Arc::clone(backend))));
        registry.register(Arc::new(SubmitUserFlag::new(Arc::clone(backend))));
        registry.register(Arc::new(SubmitRootFlag::new(Arc::clone(backend))));

        registry.register(Arc::new(GetUserProfile::new(Arc::clone(backend))));
        registry.register(Arc::new(GetUserProgress::new(Arc::clone(backend))));

        registry.register(Arc::new(SearchContent::new(Arc::clone(backend))));
        registry.register(Arc::new(GetServerStatus::new(Arc::clone(backend))));

        registry
    }

    /// Registers a tool under its name. A later registration with the same
    /// name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if self.tools.insert(name.to_string(), tool).is_some() {
            debug!(tool = name, "Replaced previously registered tool");
        }
    }

    /// Looks up a tool by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] if no tool has that name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Descriptors for every registered tool, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    /// Resolves `name` and runs the tool with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unknown names; otherwise whatever
    /// the tool returned.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult, ToolError> {
        let tool = self.resolve(name)?;
        tool.invoke(arguments).await
    }

    /// Registered tool names, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Whether a tool with this exact name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
