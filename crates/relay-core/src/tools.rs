use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GatewayError;
use crate::patch::child_path;
use crate::session::Session;
use crate::sink::PatchSink;

/// Tool declaration exposed to the upstream service.
///
/// Serializes as a Gemini `functionDeclarations` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Emission capability handed to a tool for one invocation.
///
/// Bound to the part's output scope (`payload[i].output`); everything emitted
/// through it is encoded in accumulate mode under `scope.<subpath>`.
/// When attached to a session, emission stops once the request is cancelled.
#[derive(Clone)]
pub struct ToolEmitter {
    sink: Arc<dyn PatchSink>,
    scope: String,
    session: Option<Arc<Session>>,
}

impl ToolEmitter {
    pub fn new(sink: Arc<dyn PatchSink>, scope: impl Into<String>) -> Self {
        Self {
            sink,
            scope: scope.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Whether the request this invocation belongs to has been cancelled.
    /// Long-running tools poll this between chunks.
    pub fn is_cancelled(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_cancelled())
    }

    pub fn emit(&self, value: impl Into<Value>, subpath: &str) {
        if self.is_cancelled() {
            return;
        }
        let path = child_path(&self.scope, subpath);
        self.sink.encode(&value.into(), &path, true);
    }
}

/// Trait implemented by each tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Partial output goes through `emitter`; the returned value,
    /// if any, is the final result for the part.
    async fn execute(&self, args: Value, emitter: &ToolEmitter) -> Result<Option<Value>, ToolError>;

    fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("generation failed: {0}")]
    Generation(#[from] GatewayError),
    #[error("artifact error: {0}")]
    Artifact(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Extract a required string argument.
pub fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use crate::sink::CollectingSink;
    use serde_json::json;

    #[test]
    fn emitter_appends_under_scope() {
        let sink = Arc::new(CollectingSink::new());
        let emitter = ToolEmitter::new(sink.clone(), "payload[2].output");

        emitter.emit("loading", "status");
        emitter.emit(json!({"a": "x"}), "meta");

        assert_eq!(
            sink.patches(),
            vec![
                Patch::append("payload[2].output.status", "loading"),
                Patch::append("payload[2].output.meta.a", "x"),
            ]
        );
    }

    #[test]
    fn cancelled_session_silences_emitter() {
        let sink = Arc::new(CollectingSink::new());
        let session = Arc::new(Session::new());
        assert!(session.begin_request());
        let emitter = ToolEmitter::new(sink.clone(), "payload[0].output").with_session(session.clone());

        emitter.emit("Dear ", "body");
        session.cancel();
        assert!(emitter.is_cancelled());
        emitter.emit("team", "body");

        assert_eq!(sink.patches(), vec![Patch::append("payload[0].output.body", "Dear ")]);
    }

    #[test]
    fn detached_emitter_is_never_cancelled() {
        let emitter = ToolEmitter::new(Arc::new(CollectingSink::new()), "payload[0].output");
        assert!(!emitter.is_cancelled());
    }

    #[test]
    fn descriptor_serializes_as_function_declaration() {
        let desc = ToolDescriptor {
            name: "informUser".into(),
            description: "Tell the user".into(),
            parameters: json!({"type": "object"}),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(
            json,
            json!({"name": "informUser", "description": "Tell the user", "parameters": {"type": "object"}})
        );
    }

    #[test]
    fn require_str_reports_missing_key() {
        let args = json!({"to": "a@b.c", "n": 1});
        assert_eq!(require_str(&args, "to").unwrap(), "a@b.c");
        let err = require_str(&args, "n").unwrap_err();
        assert_eq!(err.to_string(), "invalid arguments: n is required");
    }

    #[test]
    fn tool_error_from_gateway() {
        let err: ToolError = GatewayError::NetworkError("reset".into()).into();
        assert_eq!(err.to_string(), "generation failed: network error: reset");
    }
}
