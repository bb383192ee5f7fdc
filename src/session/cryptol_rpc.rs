//! Cryptol remote API client.
//!
//! The server speaks JSON-RPC 2.0 over HTTP. Every successful reply carries an
//! opaque `state` token that must be sent back with the next request; the
//! client threads it through so that loads and evaluations see each other.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::LiveSession;
use crate::error::SessionError;

/// Default address of a local `cryptol-remote-api` server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Session backed by a `cryptol-remote-api` HTTP server.
pub struct CryptolRpcSession {
    url: String,
    http_client: Client,
    state: Option<Value>,
    connected: bool,
    next_id: u64,
}

impl CryptolRpcSession {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            http_client,
            state: None,
            connected: false,
            next_id: 1,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
        let id = self.next_id;
        self.next_id += 1;
        let body = build_request(id, method, params, self.state.as_ref());
        debug!(method, id, "Cryptol RPC request");

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            SessionError::Protocol(format!("HTTP {} with unreadable body: {}", status, e))
        })?;

        let result = parse_response(payload)?;
        if let Some(state) = result.get("state") {
            self.state = Some(state.clone());
        }
        Ok(result)
    }
}

/// Builds a JSON-RPC request, attaching the current state token.
fn build_request(id: u64, method: &str, params: Value, state: Option<&Value>) -> Value {
    let mut params = match params {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    params.insert("state".to_string(), state.cloned().unwrap_or(Value::Null));

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": Value::Object(params),
    })
}

/// Extracts `result` from a JSON-RPC reply, or turns `error` into a
/// [`SessionError::Rpc`].
fn parse_response(payload: Value) -> Result<Value, SessionError> {
    if let Some(error) = payload.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let mut message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        if let Some(data) = error.get("data").filter(|d| !d.is_null()) {
            message.push_str(&format!(": {}", data));
        }
        return Err(SessionError::Rpc { code, message });
    }

    payload
        .get("result")
        .cloned()
        .ok_or_else(|| {
            SessionError::Protocol(format!("reply has neither result nor error: {}", payload))
        })
}

/// Reads a Bit answer out of an `evaluate expression` result.
fn answer_as_bit(result: &Value) -> Result<bool, SessionError> {
    let value = result
        .get("answer")
        .and_then(|answer| answer.get("value"))
        .ok_or_else(|| SessionError::Protocol(format!("missing answer value in {}", result)))?;

    value
        .as_bool()
        .ok_or_else(|| SessionError::Protocol(format!("expected a Bit result, got {}", value)))
}

#[async_trait]
impl LiveSession for CryptolRpcSession {
    async fn connect(&mut self) -> Result<(), SessionError> {
        self.state = None;
        self.call("load module", json!({ "module name": "Cryptol" })).await?;
        self.connected = true;
        Ok(())
    }

    async fn load_source(&mut self, path: &Path) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        let file = path.display().to_string();
        self.call("load file", json!({ "file": file }))
            .await
            .map_err(|e| SessionError::Load {
                path: file,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn execute(&mut self, statement: &str) -> Result<bool, SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        let result = self
            .call("evaluate expression", json!({ "expression": statement }))
            .await?;
        answer_as_bit(&result)
    }

    async fn reset(&mut self) -> Result<(), SessionError> {
        self.connected = false;
        let outcome = self.call("clear all states", json!({})).await;
        self.state = None;
        outcome.map(|_| ())
    }
}
