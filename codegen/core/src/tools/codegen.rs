//! The antd component codegen tool
//!
//! Forwards `{query, imageFilePath?}` to the remote chat API through the
//! shared [`ChatFlow`] and returns the aggregated answer as text.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ToolDescriptor, ToolError, ToolHandler, ToolOutput};
use crate::chat::{CallerKind, ChatFlow, ChatFlowError, ChatRequest};

/// Registered tool name
pub const TOOL_NAME: &str = "antd-component-codegen-mcp-tool";

/// Tool description shown to clients
pub const TOOL_DESCRIPTION: &str = "Generate Ant Design (antd) React component code from a \
natural-language description, optionally guided by a screenshot or mockup image.";

/// Codegen tool bound to one transport's caller identity
#[derive(Clone)]
pub struct CodegenTool {
    flow: ChatFlow,
    caller: CallerKind,
}

impl CodegenTool {
    /// Create the tool for the given caller
    pub fn new(flow: ChatFlow, caller: CallerKind) -> Self {
        Self { flow, caller }
    }

    /// JSON Schema of the tool arguments
    #[must_use]
    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Description of the component to generate"
                },
                "imageFilePath": {
                    "type": "string",
                    "description": "Absolute path to a reference image (optional)"
                }
            },
            "required": ["query"]
        })
    }
}

#[async_trait]
impl ToolHandler for CodegenTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            input_schema: Self::input_schema(),
        }
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        // Validation happens before any network call
        let request = ChatRequest::from_arguments(&arguments).await?;

        info!(
            caller = ?self.caller,
            with_image = request.image_file_path().is_some(),
            "Codegen tool invoked"
        );

        match self.flow.ask(&request, self.caller).await {
            Ok(result) if result.is_error => Ok(ToolOutput::error(result.text)),
            Ok(result) => Ok(ToolOutput::text(result.text)),
            Err(ChatFlowError::Upload(e)) => Err(ToolError::Internal(e.client_message())),
            Err(ChatFlowError::Chat(e)) => {
                warn!(error = %e, "Chat call failed, answering with error text");
                Ok(ToolOutput::error(e.client_message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::chat::testing::{MockBackend, MockReply};
    use crate::chat::ValidationError;

    fn tool(backend: Arc<MockBackend>) -> CodegenTool {
        CodegenTool::new(ChatFlow::new(backend), CallerKind::Pipe)
    }

    #[test]
    fn test_descriptor() {
        let backend = Arc::new(MockBackend::answering(vec![]));
        let descriptor = tool(backend).descriptor();
        assert_eq!(descriptor.name, "antd-component-codegen-mcp-tool");
        assert_eq!(descriptor.input_schema["required"], json!(["query"]));
        assert_eq!(
            descriptor.input_schema["properties"]["imageFilePath"]["type"],
            json!("string")
        );
    }

    #[tokio::test]
    async fn test_call_returns_answer() {
        let backend = Arc::new(MockBackend::answering(vec![
            "data: {\"answer\":\"<Button />\"}\n",
        ]));
        let out = tool(backend).call(json!({"query": "a button"})).await.unwrap();
        assert_eq!(out, ToolOutput::text("<Button />"));
    }

    #[tokio::test]
    async fn test_error_record_becomes_error_output() {
        let backend = Arc::new(MockBackend::answering(vec![
            "data: {\"error\":\"rate limited\"}\n",
        ]));
        let out = tool(backend).call(json!({"query": "q"})).await.unwrap();
        assert_eq!(out, ToolOutput::error("rate limited"));
    }

    #[tokio::test]
    async fn test_validation_precedes_network() {
        let backend = Arc::new(MockBackend::answering(vec![]));
        let t = tool(backend.clone());

        let err = t.call(json!({"imageFilePath": "/x.png"})).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParams(ValidationError::MissingQuery)
        ));

        let err = t.call(json!({"query": ["not", "a", "string"]})).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParams(ValidationError::QueryNotString)
        ));

        let err = t
            .call(json!({"query": "q", "imageFilePath": "/no/such/mockup-91d2.png"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParams(ValidationError::ImageNotFound(_))
        ));

        assert_eq!(backend.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_internal_error() {
        let image = NamedTempFile::new().unwrap();
        let mut backend = MockBackend::answering(vec![]);
        backend.fail_upload = true;

        let err = tool(Arc::new(backend))
            .call(json!({"query": "q", "imageFilePath": image.path().to_string_lossy()}))
            .await
            .unwrap_err();
        match err {
            ToolError::Internal(message) => assert_eq!(message, "file too large"),
            other => panic!("Expected internal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_failure_is_error_output() {
        let backend = Arc::new(MockBackend::new(MockReply::Rejected("upstream unavailable")));
        let out = tool(backend).call(json!({"query": "q"})).await.unwrap();
        assert_eq!(out, ToolOutput::error("upstream unavailable"));
    }
}
