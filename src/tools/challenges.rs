//! Challenge tools: listing, starting, and flag submission.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::args::{self, Arguments};
use super::{field_matches, paginate, Tool, ToolError, DIFFICULTIES};
use crate::htb::{field, Backend};
use crate::mcp::protocol::{CallToolResult, Property, ToolSchema};

const STATUSES: [&str; 2] = ["active", "retired"];

/// `list_challenges`: challenge catalogue with client-side filtering.
pub struct ListChallenges {
    backend: Arc<dyn Backend>,
}

impl ListChallenges {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListChallenges {
    fn name(&self) -> &'static str {
        "list_challenges"
    }

    fn description(&self) -> &'static str {
        "Get a paginated list of HackTheBox challenges with optional filtering by category, difficulty, and status"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property(
                "category",
                Property::string("Filter by challenge category (Web, Pwn, Crypto, Forensics, etc.)"),
            )
            .property(
                "difficulty",
                Property::string("Filter by difficulty level").one_of(&DIFFICULTIES),
            )
            .property(
                "status",
                Property::string("Filter by challenge status")
                    .one_of(&STATUSES)
                    .with_default("active"),
            )
            .property(
                "page",
                Property::integer("Page number for pagination").with_default(1),
            )
            .property(
                "per_page",
                Property::integer("Number of challenges per page").with_default(20),
            )
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let status = args::choice(&arguments, "status", &STATUSES, "active")?;
        let category = args::optional_str(&arguments, "category")?;
        let difficulty = args::optional_choice(&arguments, "difficulty", &DIFFICULTIES)?;
        let page = args::positive_int(&arguments, "page", 1)?;
        let per_page = args::positive_int(&arguments, "per_page", 20)?;

        let path = if status == "retired" {
            "/challenge/list/retired"
        } else {
            "/challenge/list"
        };
        debug!(status, ?category, ?difficulty, page, per_page, "Listing challenges");

        let challenges = field(self.backend.get(path).await?, "challenges");

        let items = match challenges {
            Value::Array(items) => items,
            other => return Ok(CallToolResult::json(&other)?),
        };

        let selected: Vec<Value> = items
            .into_iter()
            .filter(|c| category.map_or(true, |w| field_matches(c, &["category_name", "category"], w)))
            .filter(|c| difficulty.map_or(true, |w| field_matches(c, &["difficulty"], w)))
            .collect();

        Ok(CallToolResult::json(&paginate(selected, page, per_page))?)
    }
}

/// `start_challenge`: spawns a challenge instance.
pub struct StartChallenge {
    backend: Arc<dyn Backend>,
}

impl StartChallenge {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for StartChallenge {
    fn name(&self) -> &'static str {
        "start_challenge"
    }

    fn description(&self) -> &'static str {
        "Start a HackTheBox challenge by ID to initialize the challenge environment"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property(
                "challenge_id",
                Property::string("The ID of the challenge to start"),
            )
            .require(&["challenge_id"])
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let id = args::required_id(&arguments, "challenge_id")?;
        debug!(challenge_id = id, "Starting challenge");

        let response = self
            .backend
            .post(&format!("/challenge/{id}/start"), None)
            .await?;

        Ok(CallToolResult::json(&response)?)
    }
}

/// `submit_challenge_flag`: submits a flag together with a difficulty vote.
pub struct SubmitChallengeFlag {
    backend: Arc<dyn Backend>,
}

impl SubmitChallengeFlag {
    /// Creates the tool.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SubmitChallengeFlag {
    fn name(&self) -> &'static str {
        "submit_challenge_flag"
    }

    fn description(&self) -> &'static str {
        "Submit a flag for a HackTheBox challenge"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::object()
            .property("challenge_id", Property::string("The ID of the challenge"))
            .property("flag", Property::string("The flag to submit"))
            .property("difficulty", Property::integer("Difficulty rating (1-10)"))
            .require(&["challenge_id", "flag", "difficulty"])
    }

    async fn invoke(&self, arguments: Arguments) -> Result<CallToolResult, ToolError> {
        let id = args::required_id(&arguments, "challenge_id")?;
        let flag = args::required_str(&arguments, "flag")?;
        let difficulty = args::required_int(&arguments, "difficulty")?;

        if !(1..=10).contains(&difficulty) {
            return Err(ToolError::invalid(
                "difficulty",
                format!("must be between 1 and 10, got {difficulty}"),
            ));
        }

        // The API takes the rating on a 10-100 scale, as a string.
        let body = json!({
            "challenge_id": id.to_string(),
            "flag": flag,
            "difficulty": (difficulty * 10).to_string(),
        });
        debug!(challenge_id = id, difficulty, "Submitting challenge flag");

        let message = field(self.backend.post("/challenge/own", Some(&body)).await?, "message");

        Ok(CallToolResult::text(format!(
            "Flag submission result: {}",
            args::display_value(&message)
        )))
    }
}
