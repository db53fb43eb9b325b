//! MCP server lifecycle and dispatch.
//!
//! The server moves through three states:
//!
//! 1. **Uninitialized**: constructed, HTB API not yet probed
//! 2. **Running**: [`McpServer::start`] confirmed the API accepts the token
//! 3. **ShuttingDown**: input closed or a shutdown signal arrived (terminal)
//!
//! While running, each input line is decoded and answered before the next one
//! is read, so responses always leave in the order requests arrived. Tool
//! failures are reported inside a successful response (`isError: true`);
//! only malformed traffic produces JSON-RPC error objects.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::error::ServerError;
use crate::htb::Backend;
use crate::mcp::protocol::{
    parse_message, CallToolParams, CallToolResult, ClientInfo, InitializeParams,
    InitializeResult, ListToolsResult, Message, MessageKind, RequestId, MCP_PROTOCOL_VERSION,
};
use crate::mcp::transport::Transport;
use crate::tools::{ToolError, ToolRegistry};

/// Default bound on a single `tools/call`.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed; the backend has not been probed.
    Uninitialized,
    /// Accepting messages.
    Running,
    /// Stopped. No further messages are processed.
    ShuttingDown,
}

impl ServerState {
    /// Lower-case state name for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
        }
    }
}

/// The MCP protocol engine.
///
/// Generic over the transport's reader and writer; the binary uses
/// [`StdioTransport`](crate::mcp::transport::StdioTransport).
pub struct McpServer<R, W> {
    state: ServerState,
    transport: Transport<R, W>,
    registry: ToolRegistry,
    backend: Arc<dyn Backend>,
    call_timeout: Duration,
    /// Set by `initialize`, for logging only.
    client: Option<ClientInfo>,
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server in the `Uninitialized` state.
    pub fn new(
        transport: Transport<R, W>,
        registry: ToolRegistry,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            state: ServerState::Uninitialized,
            transport,
            registry,
            backend,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            client: None,
        }
    }

    /// Sets the bound applied to each tool invocation.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Probes the HTB API and, on success, moves to `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Startup`] if the health check fails; the server
    /// stays `Uninitialized`.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        info!("Checking HTB API connectivity");
        self.backend.health_check().await.map_err(|e| {
            error!(error = %e, "HTB API health check failed");
            ServerError::Startup(e)
        })?;

        info!(tools = self.registry.len(), "HTB API reachable, server running");
        self.state = ServerState::Running;
        Ok(())
    }

    /// Serves until input closes or the process receives SIGINT/SIGTERM
    /// (Ctrl+C on Windows).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotRunning`] if [`start`](Self::start) has not
    /// succeeded, or [`ServerError::Io`] if the transport or the signal
    /// handlers fail.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Serves until input closes or `shutdown` completes.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        if self.state != ServerState::Running {
            return Err(ServerError::NotRunning {
                state: self.state.as_str(),
            });
        }

        let result = self.serve(shutdown).await;
        self.state = ServerState::ShuttingDown;
        info!("Server stopped");
        result
    }

    async fn serve<F>(&mut self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                line = self.transport.read_line() => line,
            };

            let response = match line {
                Ok(Some(line)) => self.process_line(&line).await,
                Ok(None) => {
                    info!("Input closed");
                    return Ok(());
                }
                // The bytes are consumed; answer like any other undecodable line.
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(error = %e, "Received a line that is not UTF-8");
                    Some(Message::parse_error(e.to_string()))
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(response) = response {
                self.transport.write_message(&response).await?;
            }
        }
    }

    /// Handles one input line and returns the response to send, if any.
    ///
    /// Blank lines, notifications and stray responses produce nothing.
    pub async fn process_line(&mut self, line: &str) -> Option<Message> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let message = match parse_message(line) {
            Ok(message) => message,
            Err(error) => {
                warn!(detail = ?error.data, "Failed to parse message");
                return Some(Message::from_error(RequestId::Null, error));
            }
        };

        if let Some(problem) = message.validate() {
            warn!(problem, "Invalid JSON-RPC envelope");
            return Some(Message::invalid_request(
                message.id.unwrap_or(RequestId::Null),
                problem,
            ));
        }

        match message.kind() {
            MessageKind::Request => Some(self.handle_request(message).await),
            MessageKind::Notification => {
                Self::handle_notification(message.method_name());
                None
            }
            MessageKind::Response | MessageKind::ErrorResponse => {
                debug!(id = ?message.id, "Ignoring response sent by client");
                None
            }
        }
    }

    async fn handle_request(&mut self, message: Message) -> Message {
        let Message {
            id, method, params, ..
        } = message;
        let id = id.unwrap_or(RequestId::Null);
        let method = method.unwrap_or_default();
        debug!(%id, method = %method, "Handling request");

        match method.as_str() {
            "initialize" => self.handle_initialize(id, params),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            other => {
                warn!(method = other, "Unknown method");
                Message::method_not_found(id, other)
            }
        }
    }

    fn handle_notification(method: &str) {
        match method {
            "notifications/initialized" => debug!("Client finished initialisation"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => warn!(method = other, "Ignoring unknown notification"),
        }
    }

    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> Message {
        let params: InitializeParams = match decode_params(params) {
            Ok(params) => params,
            Err(detail) => {
                return Message::invalid_params(id, format!("Invalid initialize params: {detail}"))
            }
        };

        if params.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                client_version = %params.protocol_version,
                server_version = MCP_PROTOCOL_VERSION,
                "Protocol version mismatch, continuing with server version"
            );
        }

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                "Client connected"
            );
        }
        self.client = params.client_info;

        respond(id, &InitializeResult::default())
    }

    fn handle_tools_list(&self, id: RequestId) -> Message {
        let tools = self.registry.list();
        debug!(count = tools.len(), "Listing tools");
        respond(id, &ListToolsResult { tools })
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> Message {
        let params: CallToolParams = match decode_params(params) {
            Ok(params) => params,
            Err(detail) => {
                return Message::invalid_params(id, format!("Invalid tool call params: {detail}"))
            }
        };

        let client = self.client.as_ref().map_or("unknown", |c| c.name.as_str());
        info!(tool = %params.name, client, "Calling tool");
        let started = Instant::now();

        let invocation = self.registry.invoke(&params.name, params.arguments);
        let outcome = tokio::time::timeout(self.call_timeout, invocation)
            .await
            .unwrap_or_else(|_| Err(ToolError::Timeout(self.call_timeout)));

        let result = match outcome {
            Ok(result) => {
                debug!(tool = %params.name, elapsed = ?started.elapsed(), "Tool call finished");
                result
            }
            Err(e) => {
                warn!(
                    tool = %params.name,
                    error = %e,
                    retryable = e.is_retryable(),
                    elapsed = ?started.elapsed(),
                    "Tool call failed"
                );
                CallToolResult::error(format!("Error executing tool: {e}"))
            }
        };

        respond(id, &result)
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> Transport<R, W> {
        self.transport
    }
}

/// Decodes request params, treating absent and `null` as missing.
fn decode_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    match params {
        None | Some(Value::Null) => Err("missing params".to_string()),
        Some(value) => serde_json::from_value(value).map_err(|e| e.to_string()),
    }
}

/// Builds a success response, or an internal error if `result` cannot be
/// encoded.
fn respond<T: Serialize>(id: RequestId, result: &T) -> Message {
    match serde_json::to_value(result) {
        Ok(value) => Message::response(id, value),
        Err(e) => {
            error!(error = %e, "Failed to serialise result");
            Message::internal_error(id, format!("failed to serialise result: {e}"))
        }
    }
}

/// Resolves when the process is asked to stop.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        }
    })
}

/// Resolves when the process is asked to stop.
#[cfg(windows)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                warn!(error = %e, "Ctrl+C handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    })
}
