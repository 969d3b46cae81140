//! Tool Registry
//!
//! Tools are named, schema-described operations exposed to protocol clients.
//! Each tool is a [`ToolHandler`]; the [`ToolRegistry`] maps names to handlers
//! so dispatch never needs to know which tools exist.
//!
//! # Results vs Errors
//!
//! A handler returns `Ok(ToolOutput)` for anything the client should read as
//! a tool answer, including failed answers (`is_error: true`). `Err(ToolError)`
//! is reserved for protocol-level failures (bad arguments, unknown tool,
//! internal faults).

mod codegen;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codegen::{CodegenTool, TOOL_DESCRIPTION, TOOL_NAME};

use crate::chat::ValidationError;

/// Public description of a tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the `arguments` object
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One content block of a tool answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
}

/// A tool answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Content blocks
    pub content: Vec<ToolContent>,
    /// Whether the answer describes a failure
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful text answer
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed text answer
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Concatenated text of all content blocks
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|ToolContent::Text { text }| text.as_str())
            .collect()
    }
}

/// Protocol-level tool failures
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments failed validation
    #[error("Invalid arguments: {0}")]
    InvalidParams(#[from] ValidationError),

    /// No tool with this name is registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The tool failed in a way that is not a tool answer
    #[error("{0}")]
    Internal(String),
}

/// A callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The tool's descriptor; `name` must be stable
    fn descriptor(&self) -> ToolDescriptor;

    /// Invoke the tool with raw JSON arguments
    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolError>;
}

/// Ordered collection of tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn ToolHandler>)>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        let name = tool.descriptor().name;
        if let Some(slot) = self.tools.iter_mut().find(|(n, _)| *n == name) {
            tracing::debug!(tool = %name, "Replacing registered tool");
            slot.1 = tool;
        } else {
            self.tools.push((name, tool));
        }
    }

    /// Builder-style [`ToolRegistry::register`]
    #[must_use]
    pub fn with(mut self, tool: Arc<dyn ToolHandler>) -> Self {
        self.register(tool);
        self
    }

    /// Descriptors of all tools, in registration order
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|(_, t)| t.descriptor()).collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if `name` is not registered, or the
    /// handler's own error.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Arc::clone(t))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.call(arguments).await
    }
}
