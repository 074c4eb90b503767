use async_trait::async_trait;
use relay_core::tools::{require_str, Tool, ToolEmitter, ToolError};
use serde_json::{json, Value};

/// Narrates intent or progress to the user. No side effects.
pub struct InformUserTool;

#[async_trait]
impl Tool for InformUserTool {
    fn name(&self) -> &str {
        "informUser"
    }

    fn description(&self) -> &str {
        "Sends an informational message to the user without executing any action."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message text to display to the user, explaining the next step or providing context."
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, args: Value, _emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
        let message = require_str(&args, "message")?;
        tracing::debug!(message, "informUser");
        Ok(Some(json!({ "message": message })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::sink::CollectingSink;
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_message_without_streaming() {
        let sink = Arc::new(CollectingSink::new());
        let emitter = ToolEmitter::new(sink.clone(), "payload[0].output");

        let out = InformUserTool
            .execute(json!({"message": "Drafting your email now"}), &emitter)
            .await
            .unwrap();

        assert_eq!(out, Some(json!({"message": "Drafting your email now"})));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn missing_message_is_invalid() {
        let emitter = ToolEmitter::new(Arc::new(CollectingSink::new()), "payload[0].output");
        let err = InformUserTool.execute(json!({}), &emitter).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
