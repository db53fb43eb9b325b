//! htb-mcp-server: MCP server exposing HackTheBox labs operations as tools
//!
//! An MCP client (an AI assistant) talks JSON-RPC 2.0 to this server over
//! stdin/stdout. The server answers the `initialize`, `tools/list` and
//! `tools/call` methods and forwards tool calls to the HackTheBox labs API.
//!
//! # Modules
//!
//! - [`config`]: Environment-based configuration
//! - [`error`]: Configuration and server error types
//! - [`htb`]: HackTheBox API client behind the [`htb::Backend`] trait
//! - [`mcp`]: Wire model, transport and protocol engine
//! - [`tools`]: The tool trait, registry, and the twelve HTB tools

pub mod config;
pub mod error;
pub mod htb;
pub mod mcp;
pub mod tools;
