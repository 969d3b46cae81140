//! Protocol dispatcher
//!
//! Transport-independent: both the pipe and the push adapter hand raw
//! messages to the same [`McpServer`] and write back whatever it returns.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::jsonrpc::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::ToolRegistry;

/// Protocol version answered when the client does not ask for one
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name and version reported in `initialize`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "antd-codegen".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Outcome of decoding a raw message
#[derive(Debug)]
pub enum Decoded {
    /// A well-formed request or notification
    Request(JsonRpcRequest),
    /// A message that must be answered with this error
    Invalid(JsonRpcResponse),
}

/// Decode one raw JSON-RPC message
#[must_use]
pub fn decode_message(raw: &str) -> Decoded {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Unparseable protocol message");
            return Decoded::Invalid(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, "Parse error"),
            ));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(req) if req.jsonrpc == JSONRPC_VERSION => Decoded::Request(req),
        Ok(req) => Decoded::Invalid(JsonRpcResponse::failure(
            id,
            JsonRpcError::new(
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version {:?}", req.jsonrpc),
            ),
        )),
        Err(e) => Decoded::Invalid(JsonRpcResponse::failure(
            id,
            JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
        )),
    }
}

/// Tool protocol server
#[derive(Clone)]
pub struct McpServer {
    info: ServerInfo,
    tools: ToolRegistry,
}

impl McpServer {
    /// Create a server over a tool registry
    #[must_use]
    pub fn new(info: ServerInfo, tools: ToolRegistry) -> Self {
        Self { info, tools }
    }

    /// The server's identity
    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// The registered tools
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one raw message; `None` means nothing should be sent back
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match decode_message(raw) {
            Decoded::Request(req) => self.handle_request(req).await,
            Decoded::Invalid(response) => Some(response),
        }
    }

    /// Handle one decoded request or notification
    pub async fn handle_request(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %req.method, id = ?req.id, "Handling protocol message");

        let outcome = match req.method.as_str() {
            "initialize" => Ok(self.initialize(req.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list() })),
            "tools/call" => self.call_tool(req.params).await,
            method if method.starts_with("notifications/") => {
                debug!(method = method, "Notification received");
                return None;
            }
            method => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        };

        // Notifications never get a response, even on failure
        let id = req.id?;

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(code = error.code, message = %error.message, "Request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        info!(
            protocol_version = protocol_version,
            client = ?params.and_then(|p| p.get("clientInfo")),
            "Client initialized"
        );

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.info.name, "version": self.info.version }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "tools/call requires a string `name`"))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .filter(|a| !a.is_null())
            .unwrap_or_else(|| json!({}));

        let output = self.tools.call(name, arguments).await?;
        serde_json::to_value(output)
            .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
    }
}
