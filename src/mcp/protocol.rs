//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the wire shape of every message the server reads or
//! writes, plus the MCP-specific payloads carried inside them.
//!
//! # Message Roles
//!
//! A single [`Message`] envelope covers all four roles:
//!
//! - **Request**: has `id` and `method`, expects a response
//! - **Notification**: has `method` but no `id`, never answered
//! - **Response**: has `id` and `result`
//! - **Error response**: has `id` (possibly `null`) and `error`
//!
//! Absent optional fields are omitted when encoding. A field that was
//! explicitly `null` on the wire (for example the `id` of a parse error
//! response) stays `null` through a decode/encode round trip.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The only JSON-RPC version accepted on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "htb-mcp-server";

/// Server version reported during initialisation.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A JSON-RPC 2.0 request ID.
///
/// Numbers keep their exact source text (`7` stays `7`, `1.50` stays `1.50`,
/// `1e2` stays `1e2`) so that responses correlate with their requests
/// verbatim, whatever their magnitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestId {
    /// Numeric request ID, as written on the wire.
    Number(String),
    /// String request ID.
    String(String),
    /// Explicit `null`, used when no ID could be recovered.
    Null,
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(text) => RawValue::from_string(text.clone())
                .map_err(<S::Error as ser::Error>::custom)?
                .serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let text = raw.get();
        match text.as_bytes().first() {
            Some(b'"') => serde_json::from_str(text)
                .map(Self::String)
                .map_err(de::Error::custom),
            Some(b'-' | b'0'..=b'9') => Ok(Self::Number(text.to_string())),
            _ if text == "null" => Ok(Self::Null),
            _ => Err(de::Error::custom(
                "request id must be a string, a number or null",
            )),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self::Number(value.to_string())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Standard JSON-RPC 2.0 error codes.
///
/// This is a closed set; the server never emits any other code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }

    /// Maps a numeric code back onto the closed set.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(Self::ParseError),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            _ => None,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// The role a decoded [`Message`] plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Carries an `id`; answered with exactly one response.
    Request,
    /// No `id`; never answered.
    Notification,
    /// Successful reply.
    Response,
    /// Failed reply.
    ErrorResponse,
}

/// A JSON-RPC 2.0 envelope.
///
/// Build outgoing messages with the role constructors ([`Message::request`],
/// [`Message::response`], [`Message::error_response`],
/// [`Message::notification`]); they never populate fields that the role
/// forbids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Protocol version literal. Empty when the peer omitted it.
    #[serde(default)]
    pub jsonrpc: String,

    /// Correlation identifier. `None` means absent (notifications).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub id: Option<RequestId>,

    /// Method name (requests and notifications).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Method parameters (requests and notifications).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub params: Option<Value>,

    /// Successful result (responses).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub result: Option<Value>,

    /// Error details (error responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

/// Treats a field that is present on the wire as `Some`, even when `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Message {
    /// Creates a request.
    #[must_use]
    pub fn request(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    /// Creates a success response.
    #[must_use]
    pub fn response(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error_response(
        id: RequestId,
        code: ErrorCode,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self::from_error(
            id,
            ErrorObject {
                code: code.code(),
                message: message.into(),
                data,
            },
        )
    }

    /// Wraps an existing error object in an error response.
    #[must_use]
    pub fn from_error(id: RequestId, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Creates a notification (never carries an ID).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    /// Creates a parse error response. The ID is always `null`.
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::from_error(
            RequestId::Null,
            ErrorObject::from_code(ErrorCode::ParseError).with_data(Value::String(detail.into())),
        )
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId, detail: impl Into<String>) -> Self {
        Self::from_error(
            id,
            ErrorObject::from_code(ErrorCode::InvalidRequest).with_data(Value::String(detail.into())),
        )
    }

    /// Creates a method not found error response naming the method.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::from_error(
            id,
            ErrorObject::from_code(ErrorCode::MethodNotFound)
                .with_data(format!("Unknown method: {method}")),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, detail: impl Into<String>) -> Self {
        Self::from_error(
            id,
            ErrorObject::from_code(ErrorCode::InvalidParams).with_data(Value::String(detail.into())),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, detail: impl Into<String>) -> Self {
        Self::from_error(
            id,
            ErrorObject::from_code(ErrorCode::InternalError).with_data(Value::String(detail.into())),
        )
    }

    /// Classifies this message by the fields it populates.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        if self.error.is_some() {
            MessageKind::ErrorResponse
        } else if self.result.is_some() {
            MessageKind::Response
        } else if self.id.is_some() {
            MessageKind::Request
        } else {
            MessageKind::Notification
        }
    }

    /// Returns the method name, or `""` when absent.
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or_default()
    }

    /// Validates the envelope of an incoming message.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.result.is_some() && self.error.is_some() {
            return Some("result and error are mutually exclusive");
        }
        if self.method.is_some() && (self.result.is_some() || self.error.is_some()) {
            return Some("method cannot be combined with result or error");
        }
        None
    }
}

/// Parses one line of input into a message.
///
/// # Errors
///
/// Returns a parse error object if the text is not JSON or does not have the
/// shape of a JSON-RPC message (for example an `id` that is an object).
pub fn parse_message(json: &str) -> Result<Message, ErrorObject> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        ErrorObject::from_code(ErrorCode::ParseError).with_data(e.to_string())
    })?;

    if !value.is_object() {
        return Err(ErrorObject::from_code(ErrorCode::ParseError)
            .with_data("message must be a JSON object"));
    }

    // Decoded from the text, not the value, so numeric ids keep their spelling.
    serde_json::from_str(json)
        .map_err(|e| ErrorObject::from_code(ErrorCode::ParseError).with_data(e.to_string()))
}

// =============================================================================
// MCP payloads
// =============================================================================

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", default, skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client. Empty when omitted, which is
    /// treated like any other mismatch.
    #[serde(default)]
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Result of the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The version the server speaks, regardless of what the client asked for.
    pub protocol_version: String,
    /// Advertised capabilities.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: ServerInfo,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo::default(),
        }
    }
}

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: ToolSchema,
}

/// Result of the tools/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Every registered tool. The set is complete; there is no pagination.
    pub tools: Vec<ToolDescriptor>,
}

/// A JSON-Schema-like description of a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Declared arguments.
    pub properties: BTreeMap<String, Property>,
    /// Names of arguments that must be supplied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ToolSchema {
    /// An object schema with no properties.
    #[must_use]
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, name: &str, property: Property) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// Marks properties as required.
    #[must_use]
    pub fn require(mut self, names: &[&str]) -> Self {
        self.required.extend(names.iter().map(ToString::to_string));
        self
    }

    /// Required names that are not declared as properties.
    #[must_use]
    pub fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !self.properties.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// One argument in a [`ToolSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// JSON type name (`string`, `integer`, ...).
    #[serde(rename = "type")]
    pub property_type: String,
    /// Human-readable description.
    pub description: String,
    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    /// Value assumed when the argument is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element schema for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Property>>,
}

impl Property {
    fn typed(property_type: &str, description: &str) -> Self {
        Self {
            property_type: property_type.to_string(),
            description: description.to_string(),
            allowed: Vec::new(),
            default: None,
            items: None,
        }
    }

    /// A string argument.
    #[must_use]
    pub fn string(description: &str) -> Self {
        Self::typed("string", description)
    }

    /// An integer argument.
    #[must_use]
    pub fn integer(description: &str) -> Self {
        Self::typed("integer", description)
    }

    /// An array argument.
    #[must_use]
    pub fn array(items: Self, description: &str) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", description)
        }
    }

    /// Restricts the argument to a fixed set of values.
    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool. `null` and absent both mean "no arguments".
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text content.
        text: String,
        /// Format hint for the text.
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl Content {
    /// Creates plain text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            mime_type: None,
        }
    }

    /// Serialises `value` as indented JSON text content.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error if `value` cannot be represented as
    /// JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Text {
            text: serde_json::to_string_pretty(value)?,
            mime_type: Some("application/json".to_string()),
        })
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Creates a successful result from content blocks.
    #[must_use]
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![Content::text(text)])
    }

    /// Creates a successful JSON result.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error if `value` cannot be represented as
    /// JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::success(vec![Content::json(value)?]))
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;
    use serde_json::json;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        assert_eq!(msg.kind(), MessageKind::Request);
        assert_eq!(msg.id, Some(RequestId::from(1_i64)));
        assert_eq!(msg.method_name(), "initialize");
        assert!(msg.validate().is_none());
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        assert_eq!(msg.kind(), MessageKind::Notification);
        assert!(msg.id.is_none());
        assert_eq!(msg.method_name(), "notifications/initialized");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(msg.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn explicit_null_id_is_kept() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#).unwrap();
        assert_eq!(msg.id, Some(RequestId::Null));
        assert_eq!(msg.kind(), MessageKind::Request);
    }

    #[test]
    fn numeric_ids_echo_verbatim() {
        for raw in [
            "7",
            "1.5",
            "1.50",
            "1e2",
            "18446744073709551615",
            "-99999999999999999999",
            "-3",
        ] {
            let line = format!(r#"{{"jsonrpc":"2.0","id":{raw},"method":"tools/list"}}"#);
            let msg = parse_message(&line).unwrap();
            let id = msg.id.unwrap();

            let response = Message::response(id, json!({}));
            let encoded = serde_json::to_string(&response).unwrap();
            assert!(
                encoded.contains(&format!(r#""id":{raw}"#)),
                "{encoded} should echo id {raw}"
            );
        }
    }

    #[test]
    fn boolean_id_is_a_parse_error() {
        let err = parse_message(r#"{"jsonrpc":"2.0","id":true,"method":"x"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError.code());
        assert!(err.data.is_some());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn parse_unrepresentable_id() {
        let err = parse_message(r#"{"jsonrpc":"2.0","id":{"a":1},"method":"x"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn wrong_jsonrpc_version_fails_validation() {
        let msg = parse_message(r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#).unwrap();
        assert!(msg.validate().is_some());

        let msg = parse_message(r#"{"id": 1, "method": "test"}"#).unwrap();
        assert!(msg.validate().is_some());
    }

    #[test]
    fn method_with_result_fails_validation() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":5,"method":"tools/list","result":{}}"#)
            .unwrap();
        assert!(msg.validate().is_some());

        let msg = parse_message(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/list","error":{"code":-32603,"message":"x"}}"#,
        )
        .unwrap();
        assert!(msg.validate().is_some());
    }

    #[test]
    fn serialise_success_response() {
        let response = Message::response(RequestId::from(1_i64), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#);
    }

    #[test]
    fn serialise_error_response() {
        let error = Message::method_not_found(RequestId::from(1_i64), "unknown/method");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn parse_error_has_null_id() {
        let json = serde_json::to_string(&Message::parse_error("bad")).unwrap();
        assert!(json.contains(r#""id":null"#));
        assert!(json.contains(r#""code":-32700"#));
    }

    #[test]
    fn notification_omits_absent_fields() {
        let json = serde_json::to_string(&Message::notification("notifications/ping", None)).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","method":"notifications/ping"}"#);
    }

    #[test]
    fn constructors_respect_role_invariants() {
        let request = Message::request(1_i64, "tools/list", Some(json!({})));
        assert_eq!(request.kind(), MessageKind::Request);
        assert!(request.result.is_none() && request.error.is_none());

        let notification = Message::notification("n", None);
        assert_eq!(notification.kind(), MessageKind::Notification);
        assert!(notification.id.is_none());

        let response = Message::response(RequestId::from("r"), Value::Null);
        assert_eq!(response.kind(), MessageKind::Response);
        assert!(response.method.is_none() && response.error.is_none());

        let error = Message::error_response(
            RequestId::from(2_i64),
            ErrorCode::InvalidParams,
            "Invalid params",
            Some(json!("detail")),
        );
        assert_eq!(error.kind(), MessageKind::ErrorResponse);
        assert!(error.result.is_none() && error.method.is_none());
        assert_eq!(error.error.unwrap().code, -32602);
    }

    #[test]
    fn encode_decode_preserves_population_pattern() {
        let messages = [
            Message::request("req-1", "tools/call", Some(json!({"name": "x"}))),
            Message::request(3_i64, "tools/list", None),
            Message::response(RequestId::from(4_i64), Value::Null),
            Message::parse_error("oops"),
            Message::notification("notifications/initialized", None),
        ];

        for original in messages {
            let encoded = serde_json::to_string(&original).unwrap();
            let decoded = parse_message(&encoded).unwrap();
            assert_eq!(decoded, original, "round trip of {encoded}");
            assert_eq!(decoded.kind(), original.kind());
        }
    }

    #[test]
    fn error_codes_are_negative_and_closed() {
        for code in [
            ErrorCode::ParseError,
            ErrorCode::InvalidRequest,
            ErrorCode::MethodNotFound,
            ErrorCode::InvalidParams,
            ErrorCode::InternalError,
        ] {
            assert!(code.code() < 0);
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(-32000), None);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(RequestId::from(42_i64).to_string(), "42");
        assert_eq!(RequestId::from("abc").to_string(), "abc");
        assert_eq!(RequestId::Null.to_string(), "null");
    }

    #[test]
    fn text_content_shape() {
        let content = serde_json::to_value(Content::text("Hello, world!")).unwrap();
        assert_eq!(content, json!({"type": "text", "text": "Hello, world!"}));
    }

    #[test]
    fn json_content_is_indented_with_mime_type() {
        let content = Content::json(&json!({"name": "test", "value": 123})).unwrap();
        let Content::Text { text, mime_type } = &content;

        assert_eq!(mime_type.as_deref(), Some("application/json"));
        assert!(text.contains('\n'));
        let reparsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed["value"], 123);
    }

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("handle cannot be serialised"))
        }
    }

    #[test]
    fn json_content_propagates_serialisation_failure() {
        let err = Content::json(&Unrepresentable).unwrap_err();
        assert!(err.to_string().contains("handle cannot be serialised"));
        assert!(CallToolResult::json(&Unrepresentable).is_err());
    }

    #[test]
    fn tool_call_result_flags() {
        let ok = serde_json::to_value(CallToolResult::text("done")).unwrap();
        assert!(ok.get("isError").is_none());

        let failed = serde_json::to_value(CallToolResult::error("boom")).unwrap();
        assert_eq!(failed["isError"], true);
        assert_eq!(failed["content"][0]["type"], "text");
        assert_eq!(failed["content"][0]["text"], "boom");
    }

    #[test]
    fn schema_serialisation() {
        let schema = ToolSchema::object()
            .property(
                "status",
                Property::string("Filter by status")
                    .one_of(&["active", "retired"])
                    .with_default("active"),
            )
            .property("id", Property::integer("The ID"))
            .require(&["id"]);

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["id"]));
        assert_eq!(value["properties"]["status"]["enum"], json!(["active", "retired"]));
        assert_eq!(value["properties"]["status"]["default"], "active");
        assert!(value["properties"]["id"].get("enum").is_none());
        assert!(schema.undeclared_required().is_empty());

        let empty = serde_json::to_value(ToolSchema::object()).unwrap();
        assert!(empty.get("required").is_none());
    }

    #[test]
    fn undeclared_required_is_reported() {
        let schema = ToolSchema::object().require(&["ghost"]);
        assert_eq!(schema.undeclared_required(), vec!["ghost"]);
    }

    #[test]
    fn call_params_accept_missing_or_null_arguments() {
        let params: CallToolParams = serde_json::from_value(json!({"name": "a"})).unwrap();
        assert!(params.arguments.is_empty());

        let params: CallToolParams =
            serde_json::from_value(json!({"name": "a", "arguments": null})).unwrap();
        assert!(params.arguments.is_empty());

        assert!(serde_json::from_value::<CallToolParams>(json!({"name": "a", "arguments": [1]}))
            .is_err());
    }

    #[test]
    fn initialize_result_defaults() {
        let value = serde_json::to_value(InitializeResult::default()).unwrap();
        assert_eq!(value["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(value["capabilities"], json!({"tools": {}}));
        assert_eq!(value["serverInfo"]["name"], SERVER_NAME);
    }
}
