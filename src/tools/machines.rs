//! Machine tools: listing, spawning, the active machine, and flag submission.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::args::{self, Arguments};
use super::{field_matches, Tool, ToolError, DIFFICULTIES};
use crate::htb::{field, Backend};
use crate::mcp::protocol::{CallToolResult, Property, ToolSchema};

const STATUSES: [&str; 2] = ["active", "retired"];
const OPERATING_SYSTEMS: [&str; 2] = ["Linux", "Windows"];

/// `list_machines`: machine catalogue with client-side filtering.
pub struct ListMachines {
    backend: Arc<dyn Backend>,
}

impl ListMachines {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListMachines {
    fn name(&self) -> &'static str {
        "list_machines"
    }

    fn description(&self) -> &'static str {
        "Get a list of HackTheBox machines with optional filtering by status, difficulty, and OS"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property(
                "status",
                Property::string("Filter by machine status")
                    .one_of(&STATUSES)
                    .with_default("active"),
            )
            .property(
                "difficulty",
                Property::string("Filter by difficulty level").one_of(&DIFFICULTIES),
            )
            .property(
                "os",
                Property::string("Filter by operating system").one_of(&OPERATING_SYSTEMS),
            )
            .property(
                "page",
                Property::integer("Page number for pagination").with_default(1),
            )
            .property(
                "per_page",
                Property::integer("Number of machines per page").with_default(20),
            )
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let status = args::choice(&arguments, "status", &STATUSES, "active")?;
        let difficulty = args::optional_choice(&arguments, "difficulty", &DIFFICULTIES)?;
        let os = args::optional_choice(&arguments, "os", &OPERATING_SYSTEMS)?;
        let page = args::positive_int(&arguments, "page", 1)?;
        let per_page = args::positive_int(&arguments, "per_page", 20)?;

        // The API paginates; the filters are applied to the page it returns.
        let mut path = if status == "retired" {
            format!("/machine/list/retired/paginated/?per_page={per_page}&sort_by=release-date")
        } else {
            format!("/machine/paginated/?per_page={per_page}")
        };
        if page > 1 {
            path.push_str(&format!("&page={page}"));
        }
        debug!(status, ?difficulty, ?os, page, per_page, "Listing machines");

        let machines = match field(self.backend.get(&path).await?, "data") {
            Value::Array(items) => items,
            other => return Ok(CallToolResult::json(&other)?),
        };

        let selected: Vec<Value> = machines
            .into_iter()
            .filter(|m| {
                difficulty.map_or(true, |w| field_matches(m, &["difficultyText", "difficulty"], w))
            })
            .filter(|m| os.map_or(true, |w| field_matches(m, &["os"], w)))
            .collect();

        Ok(CallToolResult::json(&selected)?)
    }
}

/// `start_machine`: spawns a machine instance.
pub struct StartMachine {
    backend: Arc<dyn Backend>,
}

impl StartMachine {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for StartMachine {
    fn name(&self) -> &'static str {
        "start_machine"
    }

    fn description(&self) -> &'static str {
        "Start a HackTheBox machine by ID and get connection details"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property(
                "machine_id",
                Property::integer("The ID of the machine to start"),
            )
            .require(&["machine_id"])
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let id = args::required_id(&arguments, "machine_id")?;
        debug!(machine_id = id, "Starting machine");

        let body = json!({ "machine_id": id });
        let response = self
            .backend
            .post(&format!("/machine/play/{id}"), Some(&body))
            .await?;

        Ok(CallToolResult::json(&response)?)
    }
}

/// `get_machine_ip`: details of the currently spawned machine.
pub struct GetMachineIp {
    backend: Arc<dyn Backend>,
}

impl GetMachineIp {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetMachineIp {
    fn name(&self) -> &'static str {
        "get_machine_ip"
    }

    fn description(&self) -> &'static str {
        "Get the IP address of the currently active machine"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object().property(
            "machine_id",
            Property::integer("Optional machine ID. If not provided, gets the active machine IP"),
        )
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let expected = args::optional_id(&arguments, "machine_id")?;

        let active = field(self.backend.get("/machine/active").await?, "info");
        if active.is_null() {
            return Ok(CallToolResult::text("No machine is currently active"));
        }

        // Only one machine can be active at a time.
        if let Some(expected) = expected {
            let active_id = active.get("id").and_then(Value::as_u64);
            if active_id.is_some_and(|id| id != expected) {
                return Ok(CallToolResult::text(format!(
                    "Machine {expected} is not the active machine"
                )));
            }
        }

        Ok(CallToolResult::json(&active)?)
    }
}

/// Which flag a submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    User,
    Root,
}

/// Shared implementation of the user and root flag tools.
///
/// Both go to the same endpoint; the API decides which flag was submitted.
async fn submit_flag(
    backend: &dyn Backend,
    kind: FlagKind,
    arguments: &Arguments,
) -> Result<CallToolResult, ToolError> {
    let id = args::required_id(arguments, "machine_id")?;
    let flag = args::required_str(arguments, "flag")?;
    debug!(machine_id = id, ?kind, "Submitting machine flag");

    let body = json!({ "id": id, "flag": flag });
    let message = field(backend.post("/machine/own", Some(&body)).await?, "message");

    let label = match kind {
        FlagKind::User => "User",
        FlagKind::Root => "Root",
    };
    Ok(CallToolResult::text(format!(
        "{label} flag submission result: {}",
        args::display_value(&message)
    )))
}

fn flag_schema(flag_description: &str) -> ToolSchema {
    ToolSchema::object()
        .property("machine_id", Property::integer("The ID of the machine"))
        .property("flag", Property::string(flag_description))
        .require(&["machine_id", "flag"])
}

/// `submit_user_flag`.
pub struct SubmitUserFlag {
    backend: Arc<dyn Backend>,
}

impl SubmitUserFlag {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SubmitUserFlag {
    fn name(&self) -> &'static str {
        "submit_user_flag"
    }

    fn description(&self) -> &'static str {
        "Submit a user flag for a HackTheBox machine"
    }

    fn schema(&self) -> ToolSchema {
        flag_schema("The user flag to submit")
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        submit_flag(self.backend.as_ref(), FlagKind::User, &arguments).await
    }
}

/// `submit_root_flag`.
pub struct SubmitRootFlag {
    backend: Arc<dyn Backend>,
}

impl SubmitRootFlag {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SubmitRootFlag {
    fn name(&self) -> &'static str {
        "submit_root_flag"
    }

    fn description(&self) -> &'static str {
        "Submit a root flag for a HackTheBox machine"
    }

    fn schema(&self) -> ToolSchema {
        flag_schema("The root flag to submit")
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        submit_flag(self.backend.as_ref(), FlagKind::Root, &arguments).await
    }
}
