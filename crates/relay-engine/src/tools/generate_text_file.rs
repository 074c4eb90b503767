use std::sync::Arc;

use async_trait::async_trait;
use relay_core::provider::GenerationProvider;
use relay_core::tools::{require_str, Tool, ToolEmitter, ToolError};
use serde_json::{json, Value};

use super::stream_expansion;

/// Produces a long-form text document from the supplied content.
pub struct GenerateTextFileTool {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerateTextFileTool {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for GenerateTextFileTool {
    fn name(&self) -> &str {
        "generateTextFile"
    }

    fn description(&self) -> &str {
        "Generates a Microsoft Word-compatible based on the provided text content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The full text or formatted content to be inserted into a Word document."
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, args: Value, emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
        let content = require_str(&args, "content")?;

        emitter.emit("loading", "status");
        let full = stream_expansion(self.provider.as_ref(), content, emitter, "content").await?;
        emitter.emit("done", "status");

        Ok(Some(json!({ "content": full })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::sink::CollectingSink;
    use relay_core::Patch;
    use relay_llm::mock::{MockProvider, MockStream};

    #[tokio::test]
    async fn brackets_stream_with_status() {
        let provider = Arc::new(MockProvider::with_streams(
            Vec::new(),
            vec![MockStream::chunks(&["First paragraph.", "\n\nSecond."])],
        ));
        let tool = GenerateTextFileTool::new(provider);
        let sink = Arc::new(CollectingSink::new());
        let emitter = ToolEmitter::new(sink.clone(), "payload[0].output");

        let out = tool
            .execute(json!({"content": "notes"}), &emitter)
            .await
            .unwrap();

        assert_eq!(
            sink.patches(),
            vec![
                Patch::append("payload[0].output.status", "loading"),
                Patch::append("payload[0].output.content", "First paragraph."),
                Patch::append("payload[0].output.content", "\n\nSecond."),
                Patch::append("payload[0].output.status", "done"),
            ]
        );
        assert_eq!(out, Some(json!({"content": "First paragraph.\n\nSecond."})));
    }

    #[tokio::test]
    async fn non_string_content_is_invalid() {
        let tool = GenerateTextFileTool::new(Arc::new(MockProvider::new(Vec::new())));
        let emitter = ToolEmitter::new(Arc::new(CollectingSink::new()), "payload[0].output");
        let err = tool.execute(json!({"content": 5}), &emitter).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
