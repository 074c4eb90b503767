//! Request orchestration.
//!
//! One prompt produces one upstream `generate` call. The ordered response
//! parts are then emitted to the client one by one: text directly, tool calls
//! through the matching executor. Every part is followed by a `done` marker.
//!
//! Cancellation is cooperative. The session flag is checked after the
//! upstream call resolves, before each part, and after each executor returns.
//! Once a checkpoint observes it, nothing further is emitted for the request.

use std::sync::Arc;

use relay_core::ids::RequestId;
use relay_core::parts::ResponsePart;
use relay_core::patch::{child_path, part_path};
use relay_core::provider::{GenerationProvider, GenerationRequest};
use relay_core::tools::ToolEmitter;
use relay_core::{PatchSink, ServerMessage, Session};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::prompt::{user_prompt, SYSTEM_INSTRUCTION};
use crate::registry::ToolRegistry;

/// How a dispatched request ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Every part was emitted.
    Done,
    /// A checkpoint observed cancellation; emission stopped there.
    Cancelled,
    /// The upstream call failed; an error marker was sent.
    Failed(EngineError),
}

impl DispatchOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

enum Step {
    Continue,
    Cancelled,
}

pub struct Dispatcher {
    provider: Arc<dyn GenerationProvider>,
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn GenerationProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one request to completion, emitting through `sink`.
    #[instrument(skip_all, fields(request_id = %RequestId::new(), model = self.provider.model()))]
    pub async fn dispatch(
        &self,
        prompt: &str,
        session: &Arc<Session>,
        sink: Arc<dyn PatchSink>,
    ) -> DispatchOutcome {
        let request = GenerationRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            prompt: user_prompt(prompt),
            tools: self.registry.descriptors(),
        };

        debug!(tools = request.tools.len(), "awaiting upstream response");
        let result = self.provider.generate(&request).await;

        if session.is_cancelled() {
            info!("request cancelled before emission");
            return DispatchOutcome::Cancelled;
        }

        let parts = match result {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "upstream generation failed");
                sink.send(ServerMessage::error(format!("generation failed: {e}")));
                return DispatchOutcome::Failed(e.into());
            }
        };

        debug!(parts = parts.len(), "emitting response parts");
        let mut saw_tool_call = false;

        for (index, part) in parts.into_iter().enumerate() {
            if session.is_cancelled() {
                info!(part = index, "request cancelled between parts");
                return DispatchOutcome::Cancelled;
            }

            let base = part_path(index);
            match part {
                ResponsePart::Text(text) => {
                    if !text.is_empty() {
                        sink.encode(&json!({ "message": text }), &child_path(&base, "output"), false);
                    }
                }
                ResponsePart::ToolCall { name, args } => {
                    saw_tool_call = true;
                    let step = self
                        .run_tool(index, &base, &name, args, session, &sink)
                        .await;
                    if let Step::Cancelled = step {
                        info!(part = index, tool = %name, "request cancelled during tool execution");
                        return DispatchOutcome::Cancelled;
                    }
                }
                ResponsePart::Unsupported => {
                    debug!(part = index, "skipping part without text or tool call");
                }
            }

            sink.send(ServerMessage::Done);
        }

        // Text-only responses get a closing marker of their own; for an empty
        // response it is the only completion signal.
        if !saw_tool_call {
            sink.send(ServerMessage::Done);
        }
        DispatchOutcome::Done
    }

    async fn run_tool(
        &self,
        index: usize,
        base: &str,
        name: &str,
        args: Value,
        session: &Arc<Session>,
        sink: &Arc<dyn PatchSink>,
    ) -> Step {
        sink.encode(&Value::String(name.to_string()), &child_path(base, "tool"), false);

        let Some(tool) = self.registry.get(name) else {
            warn!(part = index, tool = name, "unknown tool requested, skipping");
            return Step::Continue;
        };

        let output = child_path(base, "output");
        let emitter = ToolEmitter::new(Arc::clone(sink), output.as_str()).with_session(Arc::clone(session));
        let args = if args.is_null() { json!({}) } else { args };

        debug!(part = index, tool = name, "executing tool");
        let result = tool.execute(args, &emitter).await;

        if session.is_cancelled() {
            return Step::Cancelled;
        }

        match result {
            Ok(Some(value)) => sink.encode(&value, &output, false),
            Ok(None) => {}
            Err(source) => {
                let message = source.to_string();
                let err = EngineError::Tool {
                    tool: name.to_string(),
                    source,
                };
                warn!(part = index, error = %err, "tool failed");
                sink.encode(&Value::String(message), &child_path(base, "error"), false);
            }
        }
        Step::Continue
    }
}
