//! In-memory [`Backend`] for tool and server unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::htb::{Backend, BackendError, BackendResult};

/// A request the stub received.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

type Responder = Box<dyn Fn() -> BackendResult<Value> + Send + Sync>;

/// Canned responses keyed by method and path.
#[derive(Default)]
pub struct StubBackend {
    responses: HashMap<(Method, String), Responder>,
    calls: Mutex<Vec<Recorded>>,
    unhealthy: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, path: &str, response: Value) -> Self {
        self.responses
            .insert((method, path.to_string()), Box::new(move || Ok(response.clone())));
        self
    }

    pub fn failing(mut self, method: Method, path: &str, status: u16, message: &str) -> Self {
        let message = message.to_string();
        self.responses.insert(
            (method, path.to_string()),
            Box::new(move || {
                Err(BackendError::Api {
                    status,
                    message: message.clone(),
                })
            }),
        );
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BackendResult<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Recorded {
                method: method.clone(),
                path: path.to_string(),
                body: body.cloned(),
            });
        }

        match self.responses.get(&(method, path.to_string())) {
            Some(respond) => respond(),
            None => Err(BackendError::from_response(404, r#"{"message":"not stubbed"}"#)),
        }
    }

    async fn health_check(&self) -> BackendResult<()> {
        if self.unhealthy {
            Err(BackendError::Unauthorized)
        } else {
            Ok(())
        }
    }
}

/// Builds an argument map from a `json!` object literal.
pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Parses the JSON text of a single-block tool result.
pub fn json_body(result: &crate::mcp::protocol::CallToolResult) -> Value {
    assert_eq!(result.content.len(), 1, "expected one content block");
    serde_json::from_str(result.content[0].as_text()).unwrap_or(Value::Null)
}
