use std::sync::Arc;

use async_trait::async_trait;
use relay_core::provider::GenerationProvider;
use relay_core::tools::{require_str, Tool, ToolEmitter, ToolError};
use serde_json::{json, Value};
use tracing::info;

use super::stream_expansion;

/// Drafts an email, expanding the supplied body into long-form text as it streams.
pub struct DraftEmailTool {
    provider: Arc<dyn GenerationProvider>,
}

impl DraftEmailTool {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for DraftEmailTool {
    fn name(&self) -> &str {
        "draftEmail"
    }

    fn description(&self) -> &str {
        "Creates an email draft ready for sending, including recipient, subject, and message body."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "The email address of the recipient."
                },
                "subject": {
                    "type": "string",
                    "description": "The subject line of the email."
                },
                "body": {
                    "type": "string",
                    "description": "The main content of the email body, supporting plain text or HTML."
                }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn execute(&self, args: Value, emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
        let to = require_str(&args, "to")?;
        let subject = require_str(&args, "subject")?;
        let body = require_str(&args, "body")?;

        emitter.emit("loading", "status");
        emitter.emit(to, "to");
        emitter.emit(subject, "subject");

        let full = stream_expansion(self.provider.as_ref(), body, emitter, "body").await?;
        info!(to, chars = full.len(), "email drafted");

        Ok(Some(json!({
            "status": "draft",
            "to": to,
            "subject": subject,
            "body": full,
        })))
    }
}
