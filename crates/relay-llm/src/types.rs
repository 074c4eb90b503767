//! Gemini `generateContent` request/response types.

use relay_core::errors::GatewayError;
use relay_core::parts::ResponsePart;
use relay_core::tools::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
}

impl GenerateContentRequest {
    /// A bare single-turn user request with no system instruction or tools.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            contents: vec![GeminiContent::text("user", text)],
            tools: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<TextPart>,
}

impl GeminiContent {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<ToolDescriptor>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<RawPart>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Option<Value>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[RawPart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Ordered parts of the first candidate. A response without candidates
    /// has zero parts.
    pub fn into_parts(self) -> Vec<ResponsePart> {
        self.first_parts().iter().map(RawPart::to_part).collect()
    }

    /// Concatenated text of the first candidate (one streamed chunk).
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

impl RawPart {
    fn to_part(&self) -> ResponsePart {
        if let Some(call) = &self.function_call {
            let args = call
                .args
                .clone()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            return ResponsePart::tool_call(call.name.clone(), args);
        }
        match &self.text {
            Some(text) if !text.is_empty() => ResponsePart::text(text.clone()),
            _ => ResponsePart::Unsupported,
        }
    }
}

/// Parse one streamed chunk and return its text.
pub fn parse_stream_chunk(data: &str) -> Result<String, GatewayError> {
    let chunk: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
    Ok(chunk.text())
}
