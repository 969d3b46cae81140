//! Tool protocol (JSON-RPC 2.0)
//!
//! [`jsonrpc`] holds the wire types, [`McpServer`] dispatches `initialize`,
//! `ping`, `tools/list` and `tools/call`. Notifications are accepted and
//! never answered.

pub mod jsonrpc;
mod server;

pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{decode_message, Decoded, McpServer, ServerInfo, DEFAULT_PROTOCOL_VERSION};
