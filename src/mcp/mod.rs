//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP stdio transport and the subset of the
//! protocol needed to expose tools: the `initialize` handshake, `tools/list`
//! and `tools/call`, all as JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│  Registry   │    │
//! │   │   (stdio)   │    │  (dispatch) │    │   (tools)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌──────────────────────────┐      ┌───────────────────┐  │
//! │   │    JSON-RPC Messages     │      │  HTB API Backend  │  │
//! │   └──────────────────────────┘      └───────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{Message, RequestId, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerState};
pub use transport::{StdioTransport, Transport};
