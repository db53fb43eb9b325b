//! Integration tests for MCP protocol handling.
//!
//! These tests drive the server end to end over in-memory pipes: raw
//! JSON-RPC lines go in, response lines come out. The HackTheBox API is
//! replaced by an in-memory backend.

use std::collections::{BTreeSet, HashMap};
use std::future::pending;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, BufReader};

use htb_mcp_server::error::ServerError;
use htb_mcp_server::htb::{Backend, BackendError, BackendResult};
use htb_mcp_server::mcp::{McpServer, ServerState, Transport, MCP_PROTOCOL_VERSION};
use htb_mcp_server::tools::ToolRegistry;

// =============================================================================
// Test Backend
// =============================================================================

#[derive(Default)]
struct FakeHtb {
    responses: HashMap<String, Value>,
    healthy: bool,
}

impl FakeHtb {
    fn healthy() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    fn with(mut self, path: &str, response: Value) -> Self {
        self.responses.insert(path.to_string(), response);
        self
    }
}

#[async_trait]
impl Backend for FakeHtb {
    async fn authenticated_request(
        &self,
        _method: Method,
        path: &str,
        _body: Option<&Value>,
    ) -> BackendResult<Value> {
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::from_response(404, r#"{"message":"Not Found"}"#))
    }

    async fn health_check(&self) -> BackendResult<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(BackendError::Unauthorized)
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Sends `lines` to a started server, closes its input, and returns every
/// response line plus the final server state.
async fn exchange(backend: FakeHtb, lines: &[&str]) -> (Vec<Value>, ServerState) {
    let backend: Arc<dyn Backend> = Arc::new(backend);
    let registry = ToolRegistry::with_htb_tools(&backend);

    let (mut client_in, server_in) = duplex(1 << 16);
    let (server_out, mut client_out) = duplex(1 << 16);

    let mut server = McpServer::new(
        Transport::new(BufReader::new(server_in), server_out),
        registry,
        backend,
    );
    server.start().await.expect("health check should pass");

    let serve = async move {
        server.run_until(pending()).await.expect("server loop failed");
        server.state()
    };

    let client = async move {
        for line in lines {
            client_in.write_all(line.as_bytes()).await.unwrap();
            client_in.write_all(b"\n").await.unwrap();
        }
        drop(client_in);

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        output
    };

    let (state, output) = tokio::join!(serve, client);

    let responses = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("each output line is one JSON document"))
        .collect();
    (responses, state)
}

fn initialize_request(id: i64, version: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }
    })
    .to_string()
}

fn tool_names(response: &Value) -> BTreeSet<String> {
    response["result"]["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|t| t["name"].as_str().map(str::to_string))
        .collect()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_full_session() {
    let backend = FakeHtb::healthy().with(
        "/machine/active",
        json!({"info": {"id": 1, "name": "Lame", "ip": "10.10.10.3"}}),
    );
    let init = initialize_request(1, MCP_PROTOCOL_VERSION);

    let (responses, state) = exchange(
        backend,
        &[
            init.as_str(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_machine_ip","arguments":{}}}"#,
        ],
    )
    .await;

    assert_eq!(state, ServerState::ShuttingDown);
    assert_eq!(responses.len(), 3, "the notification must not be answered");

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "htb-mcp-server");

    assert_eq!(responses[1]["id"], 2);
    assert_eq!(tool_names(&responses[1]).len(), 12);

    assert_eq!(responses[2]["id"], 3);
    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("10.10.10.3"));
}

#[tokio::test]
async fn test_version_mismatch_still_initializes() {
    let init = initialize_request(1, "2099-01-01");
    let (responses, _) = exchange(FakeHtb::healthy(), &[init.as_str()]).await;

    assert!(responses[0].get("error").is_none());
    assert_eq!(responses[0]["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
}

#[tokio::test]
async fn test_health_check_failure_blocks_startup() {
    let backend: Arc<dyn Backend> = Arc::new(FakeHtb::default());
    let registry = ToolRegistry::with_htb_tools(&backend);
    let transport = Transport::new(BufReader::new(&b""[..]), Vec::new());
    let mut server = McpServer::new(transport, registry, backend);

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::Startup(BackendError::Unauthorized)));
    assert_eq!(server.state(), ServerState::Uninitialized);

    let err = server.run_until(pending()).await.unwrap_err();
    assert!(matches!(err, ServerError::NotRunning { .. }));
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_tools_list_is_the_same_set_every_time() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ],
    )
    .await;

    let first = tool_names(&responses[0]);
    let second = tool_names(&responses[1]);
    assert_eq!(first, second);

    let expected: BTreeSet<String> = [
        "list_challenges",
        "start_challenge",
        "submit_challenge_flag",
        "list_machines",
        "start_machine",
        "get_machine_ip",
        "submit_user_flag",
        "submit_root_flag",
        "get_user_profile",
        "get_user_progress",
        "search_content",
        "get_server_status",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(first, expected);
}

#[tokio::test]
async fn test_descriptors_are_well_formed() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#],
    )
    .await;

    for tool in responses[0]["result"]["tools"].as_array().unwrap() {
        let schema = &tool["inputSchema"];
        assert_eq!(schema["type"], "object");
        let properties = schema["properties"].as_object().unwrap();
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required {
                let name = name.as_str().unwrap();
                assert!(properties.contains_key(name), "{}: {name}", tool["name"]);
            }
        }
    }
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_tool_is_an_error_result() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"nonexistent_tool","arguments":{}}}"#],
    )
    .await;

    let response = &responses[0];
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("nonexistent_tool"));
}

#[tokio::test]
async fn test_backend_failure_is_an_error_result() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_user_profile"}}"#],
    )
    .await;

    assert_eq!(responses[0]["result"]["isError"], true);
    let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error executing tool:"));
}

#[tokio::test]
async fn test_parse_error_then_recovery() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[
            "not valid json",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[1]["id"], 2);
    assert!(responses[1]["result"]["tools"].is_array());
}

#[tokio::test]
async fn test_method_not_found() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[r#"{"jsonrpc":"2.0","id":1,"method":"unknown/method"}"#],
    )
    .await;

    assert_eq!(responses[0]["error"]["code"], -32601);
    assert_eq!(responses[0]["error"]["data"], "Unknown method: unknown/method");
}

#[tokio::test]
async fn test_ids_are_echoed_verbatim() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[
            r#"{"jsonrpc":"2.0","id":"abc-123","method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":1.5,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":9007199254740993,"method":"nope"}"#,
        ],
    )
    .await;

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["id"], "abc-123");
    assert_eq!(responses[1]["id"], 1.5);
    assert_eq!(responses[2]["id"], Value::Null);
    assert_eq!(responses[3]["id"], json!(9_007_199_254_740_993_u64));
}

#[tokio::test]
async fn test_notifications_are_never_answered() {
    let (responses, _) = exchange(
        FakeHtb::healthy(),
        &[
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"get_user_profile"}}"#,
            "",
        ],
    )
    .await;

    assert!(responses.is_empty());
}
