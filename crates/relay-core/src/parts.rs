use serde_json::Value;

/// One element of the ordered response returned by the upstream service.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponsePart {
    Text(String),
    ToolCall { name: String, args: Value },
    /// A part carrying neither text nor a function call (e.g. an empty
    /// candidate part). It still occupies an index and receives a marker.
    Unsupported,
}

impl ResponsePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self::ToolCall {
            name: name.into(),
            args,
        }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}
