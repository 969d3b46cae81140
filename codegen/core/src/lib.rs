//! Codegen Core - antd component codegen bridge
//!
//! This crate exposes one tool, `antd-component-codegen-mcp-tool`, to
//! JSON-RPC tool-protocol clients and forwards each call to a remote chat
//! API that streams generated component code back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Entry points                            │
//! │  ┌──────────────┐   ┌────────────────────┐   ┌────────────────┐  │
//! │  │ Pipe (stdio) │   │ Push (SSE + POST)  │   │  CLI (`ask`)   │  │
//! │  └──────┬───────┘   └─────────┬──────────┘   └───────┬────────┘  │
//! │         │     JSON-RPC        │                      │           │
//! │         └──────────┬──────────┘                      │           │
//! │              ┌─────┴──────┐                          │           │
//! │              │ McpServer  │──► ToolRegistry          │           │
//! │              └─────┬──────┘     └─► CodegenTool      │           │
//! │                    │                      │          │           │
//! │                    └──────────────────────┼──────────┘           │
//! │                                   ┌───────┴───────┐              │
//! │                                   │   ChatFlow    │              │
//! │                                   │ upload ─► ask │              │
//! │                                   │ ─► aggregate  │              │
//! │                                   └───────┬───────┘              │
//! └───────────────────────────────────────────┼──────────────────────┘
//!                                             │ ChatBackend
//!                                   ┌─────────┴─────────┐
//!                                   │  Remote chat API  │
//!                                   │ /files/upload     │
//!                                   │ /chat-messages    │
//!                                   └───────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`McpServer`]: transport-independent JSON-RPC dispatcher
//! - [`ChatFlow`]: optional image upload, payload build, streaming call, aggregation
//! - [`StreamAggregator`]: buffered decoder for the remote answer stream
//! - [`RemoteBackend`]: HTTP client for the remote chat API
//! - [`BridgeConfig`]: layered configuration (env, TOML file, defaults)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use codegen_core::{
//!     load_config, CallerKind, ChatFlow, CodegenTool, McpServer, RemoteBackend, ServerInfo,
//!     ToolRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let flow = ChatFlow::new(Arc::new(RemoteBackend::from_config(&config)?));
//!     let tools = ToolRegistry::new().with(Arc::new(CodegenTool::new(flow, CallerKind::Pipe)));
//!     let server = McpServer::new(ServerInfo::default(), tools);
//!     codegen_core::transport::serve_stdio(&server).await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod chat;
pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;

// Re-exports for convenience
pub use backend::{ChatBackend, ChatCallError, RemoteBackend, UploadError, UploadedFileMetadata};
pub use chat::{
    AggregateEvent, AggregationResult, CallerKind, ChatFlow, ChatFlowError, ChatRequest,
    StreamAggregator, ValidationError,
};
pub use config::{load_config, load_config_from_path, BridgeConfig, ConfigError, ConfigSource};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer, ServerInfo};
pub use tools::{CodegenTool, ToolDescriptor, ToolError, ToolHandler, ToolOutput, ToolRegistry};
pub use transport::TransportError;
